//! Errors returned by the admin client.

use thiserror::Error;

/// Error code the admin service uses for an identical, already-registered entity.
pub const ALREADY_EXISTS_CODE: &str = "already_exists";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure: connect, timeout, TLS.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    /// Any non-2xx answer without a more specific variant.
    #[error("admin service returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// An identical entity is already registered under the same identifier.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A different entity is already registered under the same identifier.
    #[error("conflicting definition: {0}")]
    Conflict(String),

    #[error("client misconfigured: {0}")]
    Config(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Api { status: 404, .. })
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_) | Error::Api { status: 401, .. })
    }

    /// The server already holds an identical registration.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

/// JSON error body: `{"code": "...", "message": "..."}`.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    pub code: String,
    pub message: String,
}
