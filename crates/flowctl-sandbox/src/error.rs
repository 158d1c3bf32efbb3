//! Error types for sandbox operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The container runtime is not installed or not reachable.
    #[error("Container runtime unavailable: {message}\n\n{install_hint}")]
    Unavailable {
        message: String,
        install_hint: String,
    },

    /// A runtime command exited unsuccessfully.
    #[error("`{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The user declined removing an existing sandbox.
    #[error("Sandbox {0} already exists, remove it before starting a new one")]
    RemovalDeclined(String),

    /// No sandbox container exists.
    #[error("No sandbox found with name {0}")]
    NotFound(String),

    /// The sandbox did not report readiness in time.
    #[error("Sandbox not ready after {0:?}")]
    Timeout(Duration),

    /// Invalid sandbox configuration.
    #[error("Invalid sandbox configuration: {0}")]
    ConfigError(String),

    /// Unparseable runtime output.
    #[error("Failed to parse runtime output: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
