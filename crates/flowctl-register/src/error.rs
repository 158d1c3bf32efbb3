//! Error types for the registration pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegisterError>;

/// Errors that can occur during a registration run.
///
/// Every variant except [`RegisterError::Registration`], [`RegisterError::Cleanup`]
/// and [`RegisterError::Cancelled`] aborts the run before anything is registered.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// An input could not be found, fetched, or unpacked.
    #[error("Failed to resolve input {input}: {reason}")]
    Resolution { input: String, reason: String },

    /// The input set contains files that are not registrable.
    #[error("Input package has invalid files, run the packaging step again: {reason} {paths:?}")]
    Classification { reason: String, paths: Vec<PathBuf> },

    /// The source archive could not be uploaded.
    #[error("Failed to upload source code from {path}: {reason}")]
    Upload { path: PathBuf, reason: String },

    /// One or more entities were rejected by the admin service.
    #[error("{failed} of {attempted} registrations failed, first error: {first}")]
    Registration {
        failed: usize,
        attempted: usize,
        first: String,
    },

    /// The temporary working directory could not be removed.
    #[error("Unable to delete temp dir {path}: {reason}")]
    Cleanup { path: PathBuf, reason: String },

    /// The run was cancelled between registrations.
    #[error("Registration cancelled after {completed} entities")]
    Cancelled { completed: usize },
}

impl RegisterError {
    /// Build a resolution error for an input.
    pub fn resolution(input: impl Into<String>, reason: impl ToString) -> Self {
        RegisterError::Resolution {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborted the run before any registration was attempted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RegisterError::Resolution { .. }
                | RegisterError::Classification { .. }
                | RegisterError::Upload { .. }
        )
    }
}
