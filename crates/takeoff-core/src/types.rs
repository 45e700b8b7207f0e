//! Fixed catalogs used throughout Takeoff: industries, compliance regions,
//! analysis modes, and issue severities.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Industry
// ---------------------------------------------------------------------------

/// An industry whose elements can be detected in a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    /// Pipes, fittings, valves, and fixtures.
    Plumbing,
    /// Conduits, panels, outlets, and circuits.
    Electrical,
    /// Beams, columns, walls, and slabs.
    Structural,
    /// Ducts, fans, and mechanical units.
    Mechanical,
    /// Heating, ventilation, and air conditioning.
    Hvac,
}

impl Industry {
    /// Returns all industry variants in catalog order.
    #[must_use]
    pub const fn all() -> &'static [Industry] {
        &[
            Self::Plumbing,
            Self::Electrical,
            Self::Structural,
            Self::Mechanical,
            Self::Hvac,
        ]
    }

    /// Maps a lowercase catalog name to an [`Industry`].
    ///
    /// Returns `None` for names outside the fixed catalog; callers decide
    /// whether that is an error or a silently dropped entry.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Industry> {
        match name.trim().to_lowercase().as_str() {
            "plumbing" => Some(Self::Plumbing),
            "electrical" => Some(Self::Electrical),
            "structural" => Some(Self::Structural),
            "mechanical" => Some(Self::Mechanical),
            "hvac" => Some(Self::Hvac),
            _ => None,
        }
    }

    /// Returns the lowercase catalog name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plumbing => "plumbing",
            Self::Electrical => "electrical",
            Self::Structural => "structural",
            Self::Mechanical => "mechanical",
            Self::Hvac => "hvac",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A compliance region with its own plumbing codes and standards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Australia,
    Usa,
    Uk,
    Eu,
    Canada,
    /// ISO standards applicable everywhere.
    Global,
}

impl Region {
    /// Returns all region variants in catalog order.
    #[must_use]
    pub const fn all() -> &'static [Region] {
        &[
            Self::Australia,
            Self::Usa,
            Self::Uk,
            Self::Eu,
            Self::Canada,
            Self::Global,
        ]
    }

    /// Maps a lowercase catalog name to a [`Region`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Region> {
        match name.trim().to_lowercase().as_str() {
            "australia" | "au" => Some(Self::Australia),
            "usa" | "us" => Some(Self::Usa),
            "uk" => Some(Self::Uk),
            "eu" => Some(Self::Eu),
            "canada" | "ca" => Some(Self::Canada),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    /// Returns the lowercase catalog name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Australia => "australia",
            Self::Usa => "usa",
            Self::Uk => "uk",
            Self::Eu => "eu",
            Self::Canada => "canada",
            Self::Global => "global",
        }
    }

    /// Returns the standards published for this region.
    #[must_use]
    pub const fn standards(self) -> &'static [&'static str] {
        match self {
            Self::Australia => &["AS/NZS 3500"],
            Self::Usa => &["UPC", "IPC"],
            Self::Uk => &["BS EN 806", "BS EN 12056"],
            Self::Eu => &["EN 806", "EN 12056"],
            Self::Canada => &["NPC"],
            Self::Global => &["ISO 15874", "ISO 15875"],
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// AnalysisMode
// ---------------------------------------------------------------------------

/// Tuning preset for a detection run.
///
/// The mode adjusts the detection threshold and, for
/// [`AnalysisMode::Performance`], narrows the industry set; see the detector
/// configuration in `takeoff-pipeline`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Fastest runs, highest confidence threshold.
    Performance,
    /// Slowest runs, lowest confidence threshold.
    Accuracy,
    /// Default trade-off.
    #[default]
    Balanced,
}

impl AnalysisMode {
    /// Maps a lowercase preset name to an [`AnalysisMode`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<AnalysisMode> {
        match name.trim().to_lowercase().as_str() {
            "performance" => Some(Self::Performance),
            "accuracy" => Some(Self::Accuracy),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }

    /// Returns the lowercase preset name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Accuracy => "accuracy",
            Self::Balanced => "balanced",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a compliance issue or clash, ordered from highest impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    /// Returns the weight used when computing compliance scores.
    ///
    /// - `Critical` = 10
    /// - `Major` = 5
    /// - `Minor` = 1
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Critical => 10,
            Self::Major => 5,
            Self::Minor => 1,
        }
    }

    /// Returns all severity variants in descending order (Critical first).
    #[must_use]
    pub const fn all() -> &'static [Severity] {
        &[Self::Critical, Self::Major, Self::Minor]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
