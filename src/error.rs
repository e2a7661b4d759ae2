//! Error taxonomy shared across the repository, sync layer, and CLI.
//!
//! Three failure classes matter to callers: validation failures caught
//! before any network call, persistence failures from the remote store,
//! and authorization failures for admin-gated actions. Everything
//! degrades to "notify and leave state as it was"; there is no fatal
//! error class.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed. Raised before any
    /// persistence call is attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The remote store rejected the request or the network failed.
    #[error("remote store request failed: {0}")]
    Persistence(String),

    /// An admin-gated action was attempted by a non-admin. This check
    /// is client-side and advisory; the serverless endpoints enforce
    /// the role server-side as well.
    #[error("this action requires the admin role ({0})")]
    Authorization(String),

    /// Missing or unreadable store configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl Error {
    /// Build a validation error for a missing required field.
    pub fn missing(field: &str) -> Self {
        Error::Validation(format!("missing required field: {field}"))
    }
}
