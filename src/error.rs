//! Error types for spotfinder

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for spotfinder operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Location permission denied: {0}")]
    PermissionDenied(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("{}", .0.message)]
    Search(SearchError),
}

impl Error {
    /// Classify this error into the coarse taxonomy shown to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Unavailable(_) | Self::Json(_) => ErrorKind::Unavailable,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Http(_) => ErrorKind::Unavailable,
            Self::Config(_) | Self::Io(_) | Self::Server(_) => ErrorKind::Internal,
            Self::Search(e) => e.kind,
        }
    }

    /// Whether the caller may reasonably retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::Timeout)
    }
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    Unavailable,
    InvalidArgument,
    NotFound,
    Timeout,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Unavailable => "UNAVAILABLE",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Cloneable error snapshot published to the view layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for SearchError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<SearchError> for Error {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

/// Result type alias for spotfinder operations
pub type Result<T> = std::result::Result<T, Error>;
