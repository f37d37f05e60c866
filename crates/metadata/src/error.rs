//! Normalization Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A normalization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for normalization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every variant applies to a single search entry: the caller should skip the
/// entry and carry on with the rest of the page.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The entry does not have the shape of a Box file object.
    #[display("malformed search entry")]
    MalformedItem,
    /// A required field was absent or empty.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The entry is either parsable or it isn't; asking again returns
        // the same bytes.
        false
    }
}
