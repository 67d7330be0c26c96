//! Output format handling.
//!
//! Outputs keep the source file's format, so the format is always derived
//! from the source extension.

use crate::error::{OptimizeError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Formats the optimizer can write back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    /// PNG, recompressed with oxipng
    Png,
    Bmp,
    Gif,
}

impl OutputFormat {
    /// Whether the encoded size depends on the quality setting.
    ///
    /// JPEG quality drives the quantizer and PNG quality picks the deflate
    /// level. BMP and GIF output is identical at every quality.
    pub fn quality_sensitive(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Png)
    }

    /// Determine the format from a source path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                OptimizeError::UnsupportedFormat(format!("no file extension on {:?}", path))
            })?;
        OutputFormat::from_str(ext)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Gif => "GIF",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = OptimizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "bmp" => Ok(OutputFormat::Bmp),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(OptimizeError::UnsupportedFormat(s.to_string())),
        }
    }
}
