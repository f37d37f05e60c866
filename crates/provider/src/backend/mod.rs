//! Search backend trait and implementations.
//!
//! This module defines the `SearchBackend` trait: the single outbound call
//! the scan engine makes. Backends perform exactly one request per call and
//! never paginate on their own; pagination belongs to the caller.

#[cfg(feature = "box")]
mod box_api;
#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(feature = "box")]
pub use self::box_api::{BoxBackend, DEFAULT_BASE_URL};
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::{SearchPage, SearchRequest};
use async_trait::async_trait;

/// Unified interface for search backends.
///
/// # Errors
///
/// Implementations must classify every failure into an
/// [`ErrorKind`](crate::error::ErrorKind) before returning it. An
/// unreadable-but-successful response is **not** an error: return an empty
/// [`SearchPage`] instead.
///
/// # Examples
///
/// ```
/// use boxscan_provider::backend::SearchBackend;
/// use boxscan_provider::{SearchRequest, error::Result};
///
/// async fn count_files(backend: &dyn SearchBackend, folder: &str) -> Result<Option<u64>> {
///     let page = backend.search(&SearchRequest::new(folder, 0, 1)).await?;
///     Ok(page.total_count)
/// }
/// ```
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Name of the backend (used for logging only).
    fn name(&self) -> &str;

    /// Fetch exactly one page of search results.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;
}
