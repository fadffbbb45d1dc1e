//! Failure conditions that must stay distinguishable to hosts.

use core::fmt;

/// Errors of the asynchronous pipeline.
#[derive(Debug, Clone)]
pub enum TransformError {
    /// An import source could not be read or parsed at all.
    SourceUnavailable {
        /// Path or description of the failing source.
        source: String,
        /// Underlying reason.
        reason: String,
    },
    /// An export sink failed to persist the merged tables.
    ExportFailed {
        /// Path or description of the failing sink.
        target: String,
        /// Underlying reason.
        reason: String,
    },
}

impl fmt::Display for TransformError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { source, reason } => {
                write!(
                    formatter,
                    "custom property source unavailable: {source} ({reason})"
                )
            }
            Self::ExportFailed { target, reason } => {
                write!(
                    formatter,
                    "custom property export failed: {target} ({reason})"
                )
            }
        }
    }
}

impl core::error::Error for TransformError {}
