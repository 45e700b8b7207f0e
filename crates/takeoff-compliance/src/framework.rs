//! The compliance framework: the built-in rule catalog and the checker.

use std::collections::BTreeSet;

use tracing::{debug, info};

use takeoff_core::result::{
    ComplianceIssue, ComplianceReport, ComplianceStatus, DetectedElement, DetectionOutput,
    IssueTotals,
};
use takeoff_core::{Region, Severity};

// ---------------------------------------------------------------------------
// ComplianceError
// ---------------------------------------------------------------------------

/// Error type for compliance checks.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    /// None of the requested regions is enabled in the configuration.
    #[error("no requested region is enabled: requested {requested:?}")]
    NoEnabledRegions { requested: Vec<Region> },
}

// ---------------------------------------------------------------------------
// Rule catalog
// ---------------------------------------------------------------------------

/// One compliance rule: a predicate over a plumbing element. The check
/// returns `true` when the element passes.
struct Rule {
    id: &'static str,
    region: Region,
    standard: &'static str,
    description: &'static str,
    requirement: &'static str,
    severity: Severity,
    recommendation: &'static str,
    check: fn(&DetectedElement) -> bool,
}

fn min_diameter_half_inch(element: &DetectedElement) -> bool {
    element.diameter.is_none_or(|d| d >= 0.5)
}

fn has_approved_material(element: &DetectedElement) -> bool {
    match &element.material {
        Some(material) => {
            let material = material.to_lowercase();
            matches!(material.as_str(), "copper" | "pex" | "pvc" | "hdpe")
        }
        None => true,
    }
}

fn has_recorded_diameter(element: &DetectedElement) -> bool {
    element.element_type != "pipe" || element.diameter.is_some()
}

const RULES: &[Rule] = &[
    Rule {
        id: "aus-001",
        region: Region::Australia,
        standard: "AS/NZS 3500",
        description: "Minimum pipe diameter for water supply",
        requirement: "Water supply pipes must be at least 0.5 inches in diameter",
        severity: Severity::Major,
        recommendation: "Increase pipe diameter to at least 0.5 inches",
        check: min_diameter_half_inch,
    },
    Rule {
        id: "aus-002",
        region: Region::Australia,
        standard: "AS/NZS 3500",
        description: "Approved pipe materials",
        requirement: "Pipe material must be copper, PEX, PVC, or HDPE",
        severity: Severity::Critical,
        recommendation: "Replace with an approved pipe material",
        check: has_approved_material,
    },
    Rule {
        id: "aus-003",
        region: Region::Australia,
        standard: "AS/NZS 3500",
        description: "Pipe sizing must be documented",
        requirement: "Every pipe run must declare its nominal diameter",
        severity: Severity::Minor,
        recommendation: "Annotate the pipe run with its nominal diameter",
        check: has_recorded_diameter,
    },
    Rule {
        id: "usa-001",
        region: Region::Usa,
        standard: "UPC",
        description: "Minimum pipe diameter for water supply",
        requirement: "Water supply pipes must be at least 0.5 inches in diameter",
        severity: Severity::Major,
        recommendation: "Increase pipe diameter to at least 0.5 inches",
        check: min_diameter_half_inch,
    },
    Rule {
        id: "usa-002",
        region: Region::Usa,
        standard: "IPC",
        description: "Approved pipe materials",
        requirement: "Pipe material must be copper, PEX, PVC, or HDPE",
        severity: Severity::Critical,
        recommendation: "Replace with an approved pipe material",
        check: has_approved_material,
    },
    Rule {
        id: "uk-001",
        region: Region::Uk,
        standard: "BS EN 806",
        description: "Minimum pipe diameter for water supply",
        requirement: "Water supply pipes must be at least 0.5 inches in diameter",
        severity: Severity::Major,
        recommendation: "Increase pipe diameter to at least 0.5 inches",
        check: min_diameter_half_inch,
    },
    Rule {
        id: "eu-001",
        region: Region::Eu,
        standard: "EN 806",
        description: "Approved pipe materials",
        requirement: "Pipe material must be copper, PEX, PVC, or HDPE",
        severity: Severity::Critical,
        recommendation: "Replace with an approved pipe material",
        check: has_approved_material,
    },
    Rule {
        id: "can-001",
        region: Region::Canada,
        standard: "NPC",
        description: "Minimum pipe diameter for water supply",
        requirement: "Water supply pipes must be at least 0.5 inches in diameter",
        severity: Severity::Major,
        recommendation: "Increase pipe diameter to at least 0.5 inches",
        check: min_diameter_half_inch,
    },
    Rule {
        id: "global-001",
        region: Region::Global,
        standard: "ISO 15874",
        description: "Minimum pipe diameter for potable water",
        requirement: "Potable water pipes must be at least 0.5 inches in diameter",
        severity: Severity::Minor,
        recommendation: "Increase pipe diameter to at least 0.5 inches",
        check: min_diameter_half_inch,
    },
];

// ---------------------------------------------------------------------------
// GlobalCompliance
// ---------------------------------------------------------------------------

/// Compliance checker scoped to the regions enabled by configuration.
pub struct GlobalCompliance {
    enabled: BTreeSet<Region>,
}

impl GlobalCompliance {
    /// Builds a checker for the given enabled regions.
    #[must_use]
    pub fn new(enabled: &[Region]) -> Self {
        Self {
            enabled: enabled.iter().copied().collect(),
        }
    }

    /// Regions this checker can evaluate, in catalog order.
    #[must_use]
    pub fn enabled_regions(&self) -> Vec<Region> {
        self.enabled.iter().copied().collect()
    }

    /// Standards published for a region; empty when the region is disabled.
    #[must_use]
    pub fn region_standards(&self, region: Region) -> &'static [&'static str] {
        if self.enabled.contains(&region) {
            region.standards()
        } else {
            &[]
        }
    }

    /// Checks the detected plumbing elements against each requested region
    /// that is also enabled.
    ///
    /// With no plumbing elements present the report carries
    /// [`ComplianceStatus::Warning`] and a perfect score: nothing was
    /// checkable, but nothing failed either.
    ///
    /// # Errors
    ///
    /// Returns [`ComplianceError::NoEnabledRegions`] when the intersection
    /// of requested and enabled regions is empty. Callers treat this as a
    /// degraded stage, not a fatal analysis error.
    pub fn check(
        &self,
        detection: &DetectionOutput,
        requested: &[Region],
    ) -> Result<ComplianceReport, ComplianceError> {
        let regions: Vec<Region> = requested
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|r| self.enabled.contains(r))
            .collect();

        if regions.is_empty() {
            return Err(ComplianceError::NoEnabledRegions {
                requested: requested.to_vec(),
            });
        }

        let elements = detection.plumbing_elements();
        if elements.is_empty() {
            debug!("no plumbing elements to check; compliance passes with warning");
            return Ok(ComplianceReport {
                status: ComplianceStatus::Warning,
                regions_checked: regions,
                issues: Vec::new(),
                compliance_score: 100.0,
                issue_totals: IssueTotals::default(),
            });
        }

        let mut issues = Vec::new();
        let mut total_checks: u32 = 0;
        for rule in RULES.iter().filter(|r| regions.contains(&r.region)) {
            for element in elements {
                total_checks += 1;
                if !(rule.check)(element) {
                    issues.push(ComplianceIssue {
                        rule_id: rule.id.to_string(),
                        region: rule.region,
                        standard: rule.standard.to_string(),
                        description: rule.description.to_string(),
                        requirement: rule.requirement.to_string(),
                        severity: rule.severity,
                        element_id: element.id.clone(),
                        element_type: element.element_type.clone(),
                        recommendation: rule.recommendation.to_string(),
                    });
                }
            }
        }

        let score = compliance_score(&issues, total_checks);
        let totals = issue_totals(&issues);
        info!(
            regions = regions.len(),
            elements = elements.len(),
            issues = issues.len(),
            score,
            "compliance check complete"
        );

        Ok(ComplianceReport {
            status: ComplianceStatus::Success,
            regions_checked: regions,
            issues,
            compliance_score: score,
            issue_totals: totals,
        })
    }
}

/// Severity-weighted score in `[0, 100]`. Each issue subtracts its weight
/// as a share of the total checks performed.
fn compliance_score(issues: &[ComplianceIssue], total_checks: u32) -> f64 {
    if total_checks == 0 {
        return 100.0;
    }
    let weighted: u32 = issues.iter().map(|i| i.severity.weight()).sum();
    let penalty = f64::from(weighted) * 100.0 / f64::from(total_checks);
    (100.0 - penalty).max(0.0)
}

fn issue_totals(issues: &[ComplianceIssue]) -> IssueTotals {
    let mut totals = IssueTotals::default();
    for issue in issues {
        totals.total += 1;
        *totals.by_severity.entry(issue.severity).or_insert(0) += 1;
        *totals.by_region.entry(issue.region).or_insert(0) += 1;
    }
    totals
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
