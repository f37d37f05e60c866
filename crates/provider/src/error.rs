//! Provider Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Every failure that crosses the HTTP boundary is classified exactly once,
//! by [`ErrorKind::from_status`] or at the point a transport error is raised.
//! Everything downstream (the retry executor in particular) only ever looks
//! at the [`ErrorKind`].

use derive_more::{Display, Error};

/// A provider error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limited (429) or a server-side failure (5xx). Back off and retry.
    #[display("transient provider error (HTTP {_0})")]
    Transient(#[error(not(source))] u16),
    /// The folder or endpoint doesn't exist (404).
    #[display("resource not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The credentials are valid but lack access (403).
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Could not obtain an authenticated client for a data source.
    #[display("authentication failed: {_0}")]
    Authentication(#[error(not(source))] String),
    /// Anything else: other HTTP statuses, transport failures, bad input.
    #[display("unclassified provider error: {_0}")]
    Unclassified(#[error(not(source))] String),
}

impl ErrorKind {
    /// Classify a non-success HTTP status for the given resource.
    pub fn from_status(status: u16, resource: impl Into<String>) -> Self {
        match status {
            429 | 500..=599 => Self::Transient(status),
            404 => Self::NotFound(resource.into()),
            403 => Self::PermissionDenied(resource.into()),
            other => Self::Unclassified(format!("HTTP {other} from {}", resource.into())),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
