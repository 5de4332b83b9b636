//! Common error types for cloudbridge.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for cloudbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured service-account key file does not exist.
    #[error("Credential file not found: {}", .0.display())]
    CredentialFileMissing(PathBuf),

    /// Local credential material or client configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The identity provider did not issue an access token.
    #[error("Token acquisition failed: {0}")]
    TokenAcquisitionFailed(String),

    /// Upload endpoint answered with a non-success status.
    #[error("Upload failed: {status} - {body}")]
    UploadFailed { status: u16, body: String },

    /// Download endpoint answered with a non-success status.
    #[error("Download failed: {status} - {body}")]
    DownloadFailed { status: u16, body: String },

    /// Any other endpoint answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Transport { status: u16, body: String },

    /// The request never produced a status (connection, TLS, body stream).
    #[error("Network error: {0}")]
    Network(String),

    /// A successful response did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid local credential material.
    Configuration,
    /// Identity provider rejected or failed to issue a token.
    Authentication,
    /// Vendor endpoint failure, with or without a status.
    Transport,
    /// Expected field missing from a successful response.
    MalformedResponse,
    /// Caller supplied an unusable argument.
    Input,
    /// Local filesystem failure.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CredentialFileMissing(_) | Error::Configuration(_) => ErrorKind::Configuration,
            Error::TokenAcquisitionFailed(_) => ErrorKind::Authentication,
            Error::UploadFailed { .. }
            | Error::DownloadFailed { .. }
            | Error::Transport { .. }
            | Error::Network(_) => ErrorKind::Transport,
            Error::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Error::InvalidInput(_) => ErrorKind::Input,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UploadFailed { status, .. }
            | Error::DownloadFailed { status, .. }
            | Error::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body carried by the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::UploadFailed { body, .. }
            | Error::DownloadFailed { body, .. }
            | Error::Transport { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
