//! Export types.

use thiserror::Error;

/// Session export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Strain trace of one session
    #[default]
    PointsCsv,
    /// One summary row per session
    SummaryCsv,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::PointsCsv => write!(f, "points CSV"),
            ExportFormat::SummaryCsv => write!(f, "summary CSV"),
        }
    }
}

/// Errors during session export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export
    #[error("Session has no data to export")]
    NoData,

    /// Failed to write export data
    #[error("Failed to write data: {0}")]
    WriteFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
