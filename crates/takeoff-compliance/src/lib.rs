//! Takeoff Compliance -- checks detected plumbing elements against regional
//! plumbing codes and standards.
//!
//! The rule catalog is built in; [`GlobalCompliance`] holds the subset of
//! regions enabled by configuration and evaluates requested regions against
//! it. A compliance failure never invalidates a detection run; the
//! orchestrator degrades the result to a partial one instead.

mod framework;

pub use framework::{ComplianceError, GlobalCompliance};
