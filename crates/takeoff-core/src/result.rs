//! The analysis result document and its nested outputs.
//!
//! A result is composed of file metadata, detection output, optional
//! per-region compliance output, optional CAD-conversion metadata, and
//! run metadata. Partial results (detection succeeded, compliance failed)
//! are representable via [`ComplianceOutcome::Failed`] and are
//! distinguishable from total failure, which is never stored as a result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisMode, Industry, Region, Severity};

// ---------------------------------------------------------------------------
// Detection output
// ---------------------------------------------------------------------------

/// A coordinate in drawing space. `z` is zero for flat PDF drawings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One detected element, with industry-specific attributes where relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedElement {
    /// Identifier of the form `<industry>-<n>`, e.g. `plumbing-12`.
    pub id: String,
    /// Element type within the industry, e.g. `pipe` or `junction_box`.
    pub element_type: String,
    pub position: Position,
    /// Detection confidence in `[0, 1]`, at or above the run threshold.
    pub confidence: f64,
    /// Pipe diameter in inches (plumbing elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    /// Pipe material (plumbing elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Circuit voltage (electrical elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<u32>,
    /// Circuit label (electrical elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit: Option<String>,
}

/// Kind of spatial conflict between two elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClashType {
    HardClash,
    ClearanceIssue,
}

/// A detected conflict between elements from different industries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clash {
    /// Identifier of the form `clash-<n>`.
    pub id: String,
    pub clash_type: ClashType,
    pub severity: Severity,
    /// Identifiers of the two conflicting elements.
    pub elements: Vec<String>,
    pub position: Position,
}

/// Per-industry detection results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryDetection {
    pub element_count: u32,
    pub elements: Vec<DetectedElement>,
    /// Aggregate confidence for this industry's detections.
    pub confidence_score: f64,
}

/// Output of one detection run across all configured industries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutput {
    /// Detections keyed by industry, in catalog order.
    pub industries: BTreeMap<Industry, IndustryDetection>,
    /// Cross-industry clashes.
    pub clashes: Vec<Clash>,
    /// Confidence threshold the run was configured with.
    pub threshold: f64,
    /// Mode the run was configured with.
    pub mode: AnalysisMode,
}

impl DetectionOutput {
    /// Returns the detected plumbing elements, or an empty slice.
    #[must_use]
    pub fn plumbing_elements(&self) -> &[DetectedElement] {
        self.industries
            .get(&Industry::Plumbing)
            .map(|d| d.elements.as_slice())
            .unwrap_or_default()
    }

    /// Total element count across all industries.
    #[must_use]
    pub fn total_elements(&self) -> u32 {
        self.industries.values().map(|d| d.element_count).sum()
    }
}

// ---------------------------------------------------------------------------
// Compliance output
// ---------------------------------------------------------------------------

/// One rule violation found during a compliance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    /// Rule identifier, e.g. `aus-001`.
    pub rule_id: String,
    pub region: Region,
    /// Standard the rule belongs to, e.g. `AS/NZS 3500`.
    pub standard: String,
    pub description: String,
    pub requirement: String,
    pub severity: Severity,
    /// The element that violated the rule.
    pub element_id: String,
    pub element_type: String,
    pub recommendation: String,
}

/// Status of a completed compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    /// Elements were checked against all requested regions.
    Success,
    /// No plumbing elements were available to check.
    Warning,
}

/// Issue counts broken down by severity and region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueTotals {
    pub total: u32,
    pub by_severity: BTreeMap<Severity, u32>,
    pub by_region: BTreeMap<Region, u32>,
}

/// Result of checking detected elements against regional standards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub status: ComplianceStatus,
    pub regions_checked: Vec<Region>,
    pub issues: Vec<ComplianceIssue>,
    /// Severity-weighted score in `[0, 100]`; 100 means no issues.
    pub compliance_score: f64,
    pub issue_totals: IssueTotals,
}

/// Outcome of the compliance stage.
///
/// A failed compliance check does not invalidate a successful detection;
/// the result degrades to a partial result carrying this marker and remains
/// cacheable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceOutcome {
    Report(ComplianceReport),
    Failed { message: String },
}

impl ComplianceOutcome {
    /// Returns `true` if the compliance stage failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// File / conversion / run metadata
// ---------------------------------------------------------------------------

/// Broad category of the analyzed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileKind {
    Pdf,
    Cad,
}

/// Metadata about the analyzed file as declared by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub extension: String,
    pub kind: FileKind,
    pub size_bytes: u64,
}

/// Metadata about a CAD-to-DXF conversion performed during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    /// Source format name, e.g. `DWG`.
    pub source_format: String,
    /// Target format name; always `DXF` for the current normalizer.
    pub target_format: String,
    /// Size of the converted artifact in bytes.
    pub output_size_bytes: u64,
}

/// Metadata about the analysis run itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub duration_ms: u64,
    pub mode: AnalysisMode,
    /// Industries that were actually analyzed after intersecting the
    /// request with the globally enabled set.
    pub industries_analyzed: Vec<Industry>,
    /// Regions that were requested for compliance checking.
    pub regions_checked: Vec<Region>,
    /// Model version in effect when the result was produced.
    pub model_version: String,
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

/// The merged document returned for one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file: FileMetadata,
    pub detection: DetectionOutput,
    /// `None` when no regions were requested; `Some(Failed { .. })` when the
    /// compliance stage failed (partial result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceOutcome>,
    /// Present only for CAD inputs that went through conversion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionMetadata>,
    pub run: RunMetadata,
}

impl AnalysisResult {
    /// Returns `true` if detection succeeded but an optional stage failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.compliance.as_ref().is_some_and(|c| c.is_failed())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
