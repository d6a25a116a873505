use doctero_core::AppError;
use thiserror::Error;

use crate::backup::BackupTier;

/// Failure of a backup or cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackupError {
    /// The database export process failed to start, crashed or exited non-zero.
    #[error("database export failed: {0}")]
    ExportFailed(String),

    /// A directory or file could not be created, written, renamed, listed or removed.
    #[error("backup i/o error: {0}")]
    Io(String),

    /// The export or a filesystem step exceeded its time bound.
    #[error("backup timed out: {0}")]
    Timeout(String),

    /// A previous run for the same tier is still in progress.
    #[error("{0} backup skipped: a previous run for this tier is still in progress")]
    SkippedOverlap(BackupTier),
}

impl BackupError {
    /// Builds an I/O error with context about the attempted operation.
    #[must_use]
    pub fn io(context: impl AsRef<str>, error: &std::io::Error) -> Self {
        Self::Io(format!("{}: {error}", context.as_ref()))
    }

    /// Returns a stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExportFailed(_) => "export_failed",
            Self::Io(_) => "io_error",
            Self::Timeout(_) => "timeout",
            Self::SkippedOverlap(_) => "skipped_overlap",
        }
    }

    /// Returns whether the error is informational rather than a failed run.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkippedOverlap(_))
    }
}

impl From<BackupError> for AppError {
    fn from(value: BackupError) -> Self {
        Self::Internal(value.to_string())
    }
}
