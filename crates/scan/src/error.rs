//! Scan Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. None of these ever leave
//! [`Scanner::scan`](crate::Scanner::scan): they are rendered into the
//! `error` field of the batch result.

use boxscan_provider::error::Error as ProviderError;
use boxscan_store::error::Error as StoreError;
use derive_more::{Display, Error};

/// A scan error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable client could be obtained for the data source.
    #[display("{_0}")]
    Authentication(#[error(not(source))] String),
    /// The search request failed after any retries were exhausted.
    #[display("search failed: {_0}")]
    Search(#[error(not(source))] String),
    /// Scan order state could not be read or written.
    #[display("persistence failed: {_0}")]
    Persistence(#[error(not(source))] String),
}

impl ErrorKind {
    /// Wrap a failed authentication, keeping the provider's error frame as a
    /// child in the error tree.
    #[track_caller]
    pub fn authentication(err: ProviderError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Authentication(message))
    }

    #[track_caller]
    pub fn search(err: ProviderError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Search(message))
    }

    #[track_caller]
    pub fn persistence(err: StoreError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Persistence(message))
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Transient provider failures have already been retried by the time
    /// they surface here, so nothing at this level is worth retrying blindly.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
