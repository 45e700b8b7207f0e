//! Takeoff Convert -- format normalization for incoming drawings.
//!
//! The detection stage consumes exactly two shapes of input: PDF bytes and
//! DXF bytes. Everything else accepted at the boundary (DWG, STL, STP, STEP,
//! DGN) is converted to DXF first through a [`CadConverter`]. Normalization
//! happens after fingerprinting, so the cache key always reflects the bytes
//! the caller uploaded, never a conversion artifact.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use takeoff_core::result::{ConversionMetadata, FileKind};

// ---------------------------------------------------------------------------
// CadFormat
// ---------------------------------------------------------------------------

/// A CAD file format accepted at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadFormat {
    Dwg,
    Dxf,
    Stl,
    Stp,
    Step,
    Dgn,
}

impl CadFormat {
    /// All accepted CAD formats, in catalog order.
    #[must_use]
    pub const fn all() -> [CadFormat; 6] {
        [
            CadFormat::Dwg,
            CadFormat::Dxf,
            CadFormat::Stl,
            CadFormat::Stp,
            CadFormat::Step,
            CadFormat::Dgn,
        ]
    }

    /// Parses a normalized (lowercase, no dot) file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<CadFormat> {
        match extension {
            "dwg" => Some(CadFormat::Dwg),
            "dxf" => Some(CadFormat::Dxf),
            "stl" => Some(CadFormat::Stl),
            "stp" => Some(CadFormat::Stp),
            "step" => Some(CadFormat::Step),
            "dgn" => Some(CadFormat::Dgn),
            _ => None,
        }
    }

    /// Uppercase format name, as reported in conversion metadata.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            CadFormat::Dwg => "DWG",
            CadFormat::Dxf => "DXF",
            CadFormat::Stl => "STL",
            CadFormat::Stp => "STP",
            CadFormat::Step => "STEP",
            CadFormat::Dgn => "DGN",
        }
    }
}

impl std::fmt::Display for CadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ConvertError
// ---------------------------------------------------------------------------

/// Error type for format normalization and conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The file extension maps to no supported format. Raised before any
    /// conversion work starts.
    #[error("unsupported file format: .{extension}")]
    Unsupported { extension: String },

    /// The converter accepted the format but failed to produce DXF.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// CadConverter
// ---------------------------------------------------------------------------

/// Output of a successful CAD conversion.
#[derive(Debug, Clone)]
pub struct Converted {
    /// DXF bytes ready for detection.
    pub dxf: Vec<u8>,
}

/// Converts CAD content to DXF. Implementations must be shareable across
/// the pipeline's worker threads.
pub trait CadConverter: Send + Sync {
    /// Converts `content` from `format` to DXF.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::ConversionFailed`] when the content cannot be
    /// converted, in which case the whole analysis fails and nothing is
    /// cached for the request.
    fn convert(&self, content: &[u8], format: CadFormat) -> Result<Converted, ConvertError>;

    /// Formats this converter accepts as input.
    fn supported_formats(&self) -> Vec<CadFormat> {
        CadFormat::all().to_vec()
    }
}

// ---------------------------------------------------------------------------
// Analyzable
// ---------------------------------------------------------------------------

/// The shape of the normalized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Cad(CadFormat),
}

impl SourceKind {
    /// Broad category for file metadata.
    #[must_use]
    pub const fn file_kind(&self) -> FileKind {
        match self {
            SourceKind::Pdf => FileKind::Pdf,
            SourceKind::Cad(_) => FileKind::Cad,
        }
    }
}

/// Detection-ready input: PDF bytes or DXF bytes, plus conversion metadata
/// when a conversion happened.
#[derive(Debug, Clone)]
pub struct Analyzable {
    pub bytes: Vec<u8>,
    pub kind: SourceKind,
    /// Present only when the input went through CAD conversion.
    pub conversion: Option<ConversionMetadata>,
}

/// Normalizes request content into a detection-ready form.
///
/// PDF and DXF inputs pass through untouched. Other CAD formats are
/// delegated to `converter`. The `extension` must already be normalized
/// (lowercase, no leading dot), as request validation guarantees.
///
/// # Errors
///
/// Returns [`ConvertError::Unsupported`] for unknown extensions, before any
/// conversion work, and propagates converter failures.
pub fn normalize(
    content: &[u8],
    extension: &str,
    converter: &dyn CadConverter,
) -> Result<Analyzable, ConvertError> {
    if extension == "pdf" {
        debug!(size = content.len(), "pdf input passes through normalization");
        return Ok(Analyzable {
            bytes: content.to_vec(),
            kind: SourceKind::Pdf,
            conversion: None,
        });
    }

    let format = CadFormat::from_extension(extension).ok_or_else(|| ConvertError::Unsupported {
        extension: extension.to_string(),
    })?;

    if format == CadFormat::Dxf {
        debug!(size = content.len(), "dxf input passes through normalization");
        return Ok(Analyzable {
            bytes: content.to_vec(),
            kind: SourceKind::Cad(format),
            conversion: None,
        });
    }

    let converted = converter.convert(content, format)?;
    info!(
        source = %format,
        input_bytes = content.len(),
        output_bytes = converted.dxf.len(),
        "converted drawing to DXF"
    );
    let metadata = ConversionMetadata {
        source_format: format.name().to_string(),
        target_format: CadFormat::Dxf.name().to_string(),
        output_size_bytes: converted.dxf.len() as u64,
    };
    Ok(Analyzable {
        bytes: converted.dxf,
        kind: SourceKind::Cad(format),
        conversion: Some(metadata),
    })
}

// ---------------------------------------------------------------------------
// PlaceholderConverter
// ---------------------------------------------------------------------------

/// Stand-in converter that synthesizes a minimal DXF document carrying a
/// comment with the source format and original size. Real deployments plug
/// in a library-backed [`CadConverter`]; this one keeps the pipeline
/// end-to-end runnable without external tooling.
#[derive(Debug, Default)]
pub struct PlaceholderConverter;

impl CadConverter for PlaceholderConverter {
    fn convert(&self, content: &[u8], format: CadFormat) -> Result<Converted, ConvertError> {
        if content.is_empty() {
            return Err(ConvertError::ConversionFailed(format!(
                "empty {format} content"
            )));
        }
        let dxf = format!(
            "999\nconverted from {} ({} bytes)\n0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n",
            format.name(),
            content.len()
        );
        Ok(Converted {
            dxf: dxf.into_bytes(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
