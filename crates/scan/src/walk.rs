//! Paginated folder walker.
//!
//! One call fetches exactly one window of the folder subtree's files. The
//! walker never follows pagination on its own: deciding whether and when to
//! fetch the next window is up to the orchestrator, which persists the
//! offset between batches.

use boxscan_metadata::build_record;
use boxscan_metadata::models::FileMetadataRecord;
use boxscan_provider::{SearchBackend, SearchRequest};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

use crate::context::ScanContext;
use crate::error::{ErrorKind, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);

/// One window of normalized results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<FileMetadataRecord>,
    pub has_more: bool,
    /// How far the cursor should move if there is more to fetch.
    ///
    /// Equal to `records.len()`, except when a non-empty window yielded no
    /// usable records at all: then the whole raw window counts as consumed so
    /// an unparsable tail can't stall the sweep.
    pub consumed: u64,
}

impl Page {
    fn exhausted() -> Self {
        Self {
            records: Vec::new(),
            has_more: false,
            consumed: 0,
        }
    }
}

pub struct Walker<'a> {
    backend: &'a dyn SearchBackend,
    retry: RetryPolicy,
    rate_limit_delay: Duration,
}

impl<'a> Walker<'a> {
    pub fn new(backend: &'a dyn SearchBackend, retry: RetryPolicy, rate_limit_delay: Duration) -> Self {
        Self {
            backend,
            retry,
            rate_limit_delay,
        }
    }

    /// Fetch the window `[offset, offset + limit)` of files under `root`.
    ///
    /// With `modified_since`, only files updated at or after that instant are
    /// considered; pagination works the same either way.
    #[instrument(skip(self, ctx), fields(backend = self.backend.name()))]
    pub async fn walk(
        &self,
        ctx: &mut ScanContext,
        root: &str,
        offset: u64,
        limit: u64,
        modified_since: Option<OffsetDateTime>,
    ) -> Result<Page> {
        let mut request = SearchRequest::new(root, offset, limit);
        if let Some(since) = modified_since {
            request = request.updated_since(since).map_err(ErrorKind::search)?;
        }
        tokio::time::sleep(self.rate_limit_delay).await;
        let page = self
            .retry
            .execute(ctx, || self.backend.search(&request))
            .await
            .map_err(ErrorKind::search)?;
        if page.is_empty() {
            tracing::debug!("Empty search window; sweep is finished");
            return Ok(Page::exhausted());
        }

        let returned = page.entries.len() as u64;
        let total = page.total_count.unwrap_or(offset.saturating_add(returned));
        let mut records = Vec::with_capacity(page.entries.len());
        for entry in &page.entries {
            match build_record(entry, root) {
                Ok(record) => records.push(record),
                Err(err) => {
                    ctx.record_api_error();
                    let id = entry.get("id").and_then(|id| id.as_str()).unwrap_or("<unknown>");
                    tracing::warn!(item = id, error = %*err, "Skipping entry that could not be normalized");
                },
            }
        }

        let consumed = if records.is_empty() { returned } else { records.len() as u64 };
        let has_more = offset.saturating_add(consumed) < total;
        tracing::info!(returned, normalized = records.len(), total, has_more, "Fetched search window");
        Ok(Page {
            records,
            has_more,
            consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxscan_provider::SearchPage;
    use boxscan_provider::backend::MockBackend;
    use boxscan_provider::error::ErrorKind as ProviderErrorKind;
    use rstest::rstest;
    use serde_json::json;
    use time::macros::datetime;
    use tokio::time::Instant;

    fn walker(backend: &MockBackend) -> Walker<'_> {
        Walker::new(backend, RetryPolicy::new(3, Duration::from_millis(10)), DEFAULT_RATE_LIMIT_DELAY)
    }

    #[rstest]
    #[case(0, 100, 100, true)]
    #[case(100, 100, 100, true)]
    #[case(200, 100, 50, false)]
    #[case(0, 300, 250, false)]
    #[case(150, 100, 100, false)]
    #[tokio::test(start_paused = true)]
    async fn test_windows(#[case] offset: u64, #[case] limit: u64, #[case] returned: usize, #[case] has_more: bool) {
        let backend = MockBackend::with_files("0", 250);
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", offset, limit, None).await.unwrap();
        assert_eq!(page.records.len(), returned);
        assert_eq!(page.consumed, returned as u64);
        assert_eq!(page.has_more, has_more);
        assert_eq!(ctx.api_calls_made, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_shape() {
        let backend = MockBackend::with_files("42", 3);
        let mut ctx = ScanContext::new();
        let since = datetime!(2024-05-01 12:30:45.9 UTC);
        walker(&backend).walk(&mut ctx, "42", 0, 300, Some(since)).await.unwrap();
        let requests = backend.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ancestor_folder_id, "42");
        assert_eq!(requests[0].limit, 300);
        assert_eq!(requests[0].offset, 0);
        assert_eq!(requests[0].updated_since.as_deref(), Some("2024-05-01T12:30:45Z"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_delay_precedes_request() {
        let backend = MockBackend::with_files("0", 1);
        let mut ctx = ScanContext::new();
        let start = Instant::now();
        walker(&backend).walk(&mut ctx, "0", 0, 10, None).await.unwrap();
        assert_eq!(start.elapsed(), DEFAULT_RATE_LIMIT_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_or_malformed_response() {
        let backend = MockBackend::default();
        backend.respond_next(SearchPage::default()).await;
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", 500, 100, None).await.unwrap();
        assert_eq!(page, Page::exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_total_count() {
        let backend = MockBackend::default();
        let entries = (0..10).map(|i| MockBackend::file_entry(&i.to_string(), "0")).collect();
        backend.respond_next(SearchPage { entries, total_count: None }).await;
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", 20, 10, None).await.unwrap();
        assert_eq!(page.records.len(), 10);
        // offset + returned == assumed total
        assert!(!page.has_more);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(5))]
    #[tokio::test(start_paused = true)]
    async fn test_offset_at_upper_bound(#[case] total_count: Option<u64>) {
        let backend = MockBackend::default();
        let entries = vec![MockBackend::file_entry("1", "0")];
        backend.respond_next(SearchPage { entries, total_count }).await;
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", u64::MAX, 10, None).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(!page.has_more);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_entries_are_skipped_and_counted() {
        let backend = MockBackend::default();
        let entries = vec![
            MockBackend::file_entry("1", "0"),
            json!({ "name": "no-id.txt" }),
            MockBackend::file_entry("2", "0"),
            json!({ "id": "3", "modified_at": "last tuesday" }),
        ];
        backend.respond_next(SearchPage::new(entries, 10)).await;
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", 0, 4, None).await.unwrap();
        assert_eq!(page.records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(page.consumed, 2);
        assert!(page.has_more);
        assert_eq!(ctx.api_calls_made, 1);
        assert_eq!(ctx.api_errors_encountered, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparsable_window_is_consumed() {
        let backend = MockBackend::default();
        let entries = (0..5).map(|_| json!({ "type": "file" })).collect();
        backend.respond_next(SearchPage::new(entries, 20)).await;
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", 10, 5, None).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.consumed, 5);
        assert!(page.has_more);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let backend = MockBackend::with_files("0", 5);
        backend.fail_next(ProviderErrorKind::Transient(429)).await;
        backend.fail_next(ProviderErrorKind::Transient(502)).await;
        let mut ctx = ScanContext::new();
        let page = walker(&backend).walk(&mut ctx, "0", 0, 10, None).await.unwrap();
        assert_eq!(page.records.len(), 5);
        assert_eq!(ctx.api_calls_made, 3);
        assert_eq!(ctx.api_errors_encountered, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_failure() {
        let backend = MockBackend::with_files("0", 5);
        backend.fail_next(ProviderErrorKind::NotFound("folder 0".to_string())).await;
        let mut ctx = ScanContext::new();
        let err = walker(&backend).walk(&mut ctx, "0", 0, 10, None).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Search("resource not found: folder 0".to_string()));
        assert_eq!(backend.requests().await.len(), 1);
    }
}
