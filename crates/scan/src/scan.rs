use boxscan_provider::{Authenticator, DataSource, SearchBackend};
use boxscan_store::{ScanOrder, ScanOrderStore, ScanType};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;

use crate::context::ScanContext;
use crate::cursor::{self, Cursor};
use crate::error::{ErrorKind, Result};
use crate::models::ScanResult;
use crate::retry::RetryPolicy;
use crate::walk::{DEFAULT_RATE_LIMIT_DELAY, Page, Walker};

pub const DEFAULT_MAX_BATCH_SIZE: u64 = 300;

/// Tunables for a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Page size of the single search request issued per batch
    pub max_batch_size: u64,
    /// Pause before every search request
    pub rate_limit_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Runs one bounded batch of a resumable folder sweep.
///
/// A sweep enumerates every file below the data source's root folder (or,
/// for incremental scan orders, every file changed since a reference time)
/// across as many batches as it takes. Each call to [`scan`](Self::scan)
/// fetches one window, persists where the next window starts, and reports
/// whether the sweep is finished. Once it is, the cursor resets to zero and
/// the next call starts a fresh sweep.
///
/// The scanner holds no per-scan state, so one instance can serve any number
/// of data sources one call at a time.
#[derive(Clone)]
pub struct Scanner {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn ScanOrderStore>,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(authenticator: Arc<dyn Authenticator>, store: Arc<dyn ScanOrderStore>) -> Self {
        Self {
            authenticator,
            store,
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan the next batch for `order`.
    ///
    /// Never fails: every problem is reported through [`ScanResult::error`].
    /// The cursor in `order.scan_metadata` is updated in place and saved to
    /// the store on every path except an authentication failure, where it is
    /// left untouched.
    #[instrument(skip_all, fields(data_source = %source.id, scan_order = %order.id, scan_type = %order.scan_type))]
    pub async fn scan(&self, source: &DataSource, order: &mut ScanOrder) -> ScanResult {
        let mut ctx = ScanContext::new();
        let authenticated = match self.authenticator.authenticate(source).await {
            Ok(authenticated) => authenticated,
            Err(err) => {
                let err = ErrorKind::authentication(err);
                tracing::error!(error = %*err, "Could not authenticate data source");
                return ScanResult::failed(Vec::new(), ctx.stats(0, false), (*err).to_string());
            },
        };
        let root = source.root_folder_id();
        let stored = order.scan_metadata.cursor.as_ref();
        let offset = cursor::restore(stored);
        // A fresh sweep resolves its own lower bound.
        let pinned = if offset > 0 { cursor::restore_modified_since(stored) } else { None };
        tracing::info!(root, offset, limit = self.options.max_batch_size, "Starting scan batch");

        let result = match self.fetch(&mut ctx, authenticated.backend.as_ref(), root, offset, pinned, order).await {
            Ok((page, since)) => self.finish(&ctx, order, offset, since, page).await,
            Err(err) => {
                tracing::error!(error = %*err, offset, "Scan batch failed");
                // Keep the last good offset; a failed save is secondary to the
                // failure already being reported.
                let unchanged = Cursor::new(offset).with_modified_since(pinned);
                if let Err(save_err) = cursor::persist(self.store.as_ref(), order, unchanged).await {
                    tracing::warn!(error = %*save_err, "Could not persist cursor after failure");
                }
                ScanResult::failed(Vec::new(), ctx.stats(0, false), (*err).to_string())
            },
        };
        result.with_updated_credentials(authenticated.updated_credentials)
    }

    async fn fetch(
        &self,
        ctx: &mut ScanContext,
        backend: &dyn SearchBackend,
        root: &str,
        offset: u64,
        pinned: Option<OffsetDateTime>,
        order: &ScanOrder,
    ) -> Result<(Page, Option<OffsetDateTime>)> {
        let since = match order.scan_type {
            ScanType::Full => None,
            ScanType::Incremental => Some(self.reference_time(order, pinned).await?),
        };
        let page = Walker::new(backend, self.options.retry, self.options.rate_limit_delay)
            .walk(ctx, root, offset, self.options.max_batch_size, since)
            .await?;
        Ok((page, since))
    }

    /// Lower bound for an incremental sweep: the order's own reference time,
    /// else the bound the sweep in progress started with, else the last
    /// completed scan of the same data source, else the epoch.
    async fn reference_time(&self, order: &ScanOrder, pinned: Option<OffsetDateTime>) -> Result<OffsetDateTime> {
        if let Some(since) = order.scanned_from.or(pinned) {
            return Ok(since);
        }
        let last = self
            .store
            .last_completed_scan_timestamp(&order.data_source_id)
            .await
            .map_err(ErrorKind::persistence)?;
        Ok(last.unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    async fn finish(
        &self,
        ctx: &ScanContext,
        order: &mut ScanOrder,
        offset: u64,
        since: Option<OffsetDateTime>,
        page: Page,
    ) -> ScanResult {
        let next = cursor::advance(offset, page.consumed, page.has_more);
        let completed = !page.has_more;
        let files_count = page.records.len();
        let cursor = Cursor::new(next).with_modified_since(since.filter(|_| page.has_more));
        match cursor::persist(self.store.as_ref(), order, cursor).await {
            Ok(()) => {
                tracing::info!(files = files_count, next_offset = next, completed, "Scan batch finished");
                ScanResult::success(page.records, completed, ctx.stats(files_count, completed))
            },
            Err(err) => {
                tracing::error!(error = %*err, next_offset = next, "Could not persist cursor");
                // The records are still handed back; the next batch repeats this window.
                ScanResult::failed(page.records, ctx.stats(files_count, false), (*err).to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use boxscan_provider::backend::MockBackend;
    use boxscan_provider::error::ErrorKind as ProviderErrorKind;
    use boxscan_provider::{BackendHandle, DataSourceMetadata, StaticAuthenticator};
    use boxscan_store::MemoryStore;
    use boxscan_store::error::{ErrorKind as StoreErrorKind, Result as StoreResult};
    use serde_json::{Value, json};
    use time::macros::datetime;

    const OPTIONS: ScanOptions = ScanOptions {
        max_batch_size: 100,
        rate_limit_delay: Duration::from_millis(500),
        retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        },
    };

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl ScanOrderStore for BrokenStore {
        async fn load_cursor(&self, _scan_order_id: &str) -> StoreResult<Option<Value>> {
            exn::bail!(StoreErrorKind::Database)
        }

        async fn save_cursor(&self, _scan_order_id: &str, _cursor: &Value) -> StoreResult<()> {
            exn::bail!(StoreErrorKind::Database)
        }

        async fn last_completed_scan_timestamp(&self, _data_source_id: &str) -> StoreResult<Option<OffsetDateTime>> {
            exn::bail!(StoreErrorKind::Database)
        }
    }

    fn source(folder_id: &str) -> DataSource {
        DataSource {
            id: "ds-1".to_string(),
            auth_type: Some("token".to_string()),
            metadata: DataSourceMetadata {
                folder_id: Some(folder_id.to_string()),
            },
            credentials: json!({ "access_token": "t" }),
        }
    }

    fn scanner(auth: StaticAuthenticator, store: Arc<dyn ScanOrderStore>) -> Scanner {
        Scanner::new(Arc::new(auth), store).with_options(OPTIONS)
    }

    async fn setup(backend: Arc<MockBackend>, order: &ScanOrder) -> (Scanner, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.insert(order.clone()).await;
        let handle: BackendHandle = backend;
        (scanner(StaticAuthenticator::new(handle), store.clone()), store)
    }

    async fn stored_offset(store: &MemoryStore, order_id: &str) -> u64 {
        cursor::restore(store.load_cursor(order_id).await.unwrap().as_ref())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_batch_persists_cursor() {
        let backend = Arc::new(MockBackend::with_files("7", 250));
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Full);
        let (scanner, store) = setup(backend.clone(), &order).await;
        let result = scanner.scan(&source("7"), &mut order).await;
        assert!(result.error.is_none());
        assert_eq!(result.files.len(), 100);
        assert!(!result.is_completed);
        assert_eq!(result.stats.files_count, 100);
        assert_eq!(result.stats.api_calls_made, 1);
        assert!(result.stats.scan_completed_at.is_none());
        assert_eq!(stored_offset(&store, "order-1").await, 100);
        assert_eq!(order.scan_metadata.cursor, store.load_cursor("order-1").await.unwrap());
        assert_eq!(backend.requests().await[0].ancestor_folder_id, "7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_from_order_cursor() {
        let backend = Arc::new(MockBackend::with_files("0", 250));
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Full);
        order.scan_metadata.cursor = Some(json!({ "current_offset": "200" }));
        let (scanner, store) = setup(backend.clone(), &order).await;
        let result = scanner.scan(&source(""), &mut order).await;
        assert_eq!(result.files.len(), 50);
        assert!(result.is_completed);
        assert!(result.stats.scan_completed_at.is_some());
        let requests = backend.requests().await;
        assert_eq!(requests[0].offset, 200);
        assert_eq!(requests[0].ancestor_folder_id, "0");
        assert_eq!(stored_offset(&store, "order-1").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_leaves_cursor() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files("0", 10));
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Full);
        order.scan_metadata.cursor = Some(json!({ "current_offset": 5 }));
        let store = Arc::new(MemoryStore::new());
        store.insert(order.clone()).await;
        let scanner = scanner(StaticAuthenticator::new(backend).failing("token revoked"), store.clone());
        let result = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(result.error.as_deref(), Some("authentication failed: token revoked"));
        assert!(result.files.is_empty());
        assert!(!result.is_completed);
        assert_eq!(result.stats.api_calls_made, 0);
        assert_eq!(order.scan_metadata.cursor, Some(json!({ "current_offset": 5 })));
        assert_eq!(store.get("order-1").await.unwrap().scan_metadata.cursor, Some(json!({ "current_offset": 5 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_failure_persists_unchanged_cursor() {
        let backend = Arc::new(MockBackend::with_files("0", 250));
        for _ in 0..4 {
            backend.fail_next(ProviderErrorKind::Transient(503)).await;
        }
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Full);
        order.scan_metadata.cursor = Some(json!({ "current_offset": 100 }));
        let (scanner, store) = setup(backend, &order).await;
        let result = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(result.error.as_deref(), Some("search failed: transient provider error (HTTP 503)"));
        assert!(result.files.is_empty());
        assert!(!result.is_completed);
        assert_eq!(result.stats.api_calls_made, 4);
        assert_eq!(result.stats.api_errors_encountered, 4);
        assert_eq!(stored_offset(&store, "order-1").await, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_merged_on_success_and_failure() {
        let backend = Arc::new(MockBackend::with_files("0", 3));
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Full);
        let store = Arc::new(MemoryStore::new());
        store.insert(order.clone()).await;
        let handle: BackendHandle = backend.clone();
        let fresh = json!({ "access_token": "rotated" });
        let scanner = scanner(StaticAuthenticator::new(handle).with_updated_credentials(fresh.clone()), store);

        let result = scanner.scan(&source("0"), &mut order).await;
        assert!(result.error.is_none());
        assert_eq!(result.updated_credentials, Some(fresh.clone()));

        backend.fail_next(ProviderErrorKind::PermissionDenied("folder 0".to_string())).await;
        let result = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(result.error.as_deref(), Some("search failed: permission denied: folder 0"));
        assert_eq!(result.updated_credentials, Some(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_reference_times() {
        let mut fresh = MockBackend::file_entry("2", "0");
        fresh["modified_at"] = json!("2024-06-01T00:00:00Z");
        let backend = Arc::new(MockBackend::with_entries([MockBackend::file_entry("1", "0"), fresh]));

        // Explicit reference time on the order.
        let mut order =
            ScanOrder::new("inc-1", "ds-1", ScanType::Incremental).with_scanned_from(datetime!(2024-03-01 00:00:00 UTC));
        let (scanner, store) = setup(backend.clone(), &order).await;
        let result = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(result.files.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(), vec!["2"]);
        assert!(result.is_completed);

        // Falls back to the last completed scan of the same data source.
        store.insert(ScanOrder::new("full-1", "ds-1", ScanType::Full)).await;
        store.mark_completed("full-1", datetime!(2024-07-01 00:00:00 UTC)).await.unwrap();
        let mut order = ScanOrder::new("inc-2", "ds-1", ScanType::Incremental);
        store.insert(order.clone()).await;
        let result = scanner.scan(&source("0"), &mut order).await;
        assert!(result.files.is_empty());
        assert!(result.is_completed);
        let requests = backend.requests().await;
        assert_eq!(requests[0].updated_since.as_deref(), Some("2024-03-01T00:00:00Z"));
        assert_eq!(requests[1].updated_since.as_deref(), Some("2024-07-01T00:00:00Z"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_sweep_keeps_its_lower_bound() {
        let entries = (0..150).map(|index| {
            let mut entry = MockBackend::file_entry(&index.to_string(), "0");
            entry["modified_at"] = json!("2024-08-01T00:00:00Z");
            entry
        });
        let backend = Arc::new(MockBackend::with_entries(entries));
        let mut order = ScanOrder::new("inc-1", "ds-1", ScanType::Incremental);
        let (scanner, store) = setup(backend.clone(), &order).await;
        store.insert(ScanOrder::new("full-1", "ds-1", ScanType::Full)).await;
        store.mark_completed("full-1", datetime!(2024-07-01 00:00:00 UTC)).await.unwrap();

        let first = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(first.files.len(), 100);
        let stored = store.load_cursor("inc-1").await.unwrap();
        assert_eq!(cursor::restore_modified_since(stored.as_ref()), Some(datetime!(2024-07-01 00:00:00 UTC)));

        // Another sweep of the same data source finishes in between.
        store.insert(ScanOrder::new("full-2", "ds-1", ScanType::Full)).await;
        store.mark_completed("full-2", datetime!(2024-09-01 00:00:00 UTC)).await.unwrap();
        let second = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(second.files.len(), 50);
        assert!(second.is_completed);
        let stored = store.load_cursor("inc-1").await.unwrap();
        assert_eq!(cursor::restore_modified_since(stored.as_ref()), None);

        // The next sweep picks up the newer bound.
        let third = scanner.scan(&source("0"), &mut order).await;
        assert!(third.files.is_empty());
        let since: Vec<_> = backend.requests().await.into_iter().map(|request| request.updated_since).collect();
        assert_eq!(
            since,
            vec![
                Some("2024-07-01T00:00:00Z".to_string()),
                Some("2024-07-01T00:00:00Z".to_string()),
                Some("2024-09-01T00:00:00Z".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_defaults_to_epoch() {
        let backend = Arc::new(MockBackend::with_files("0", 2));
        let mut order = ScanOrder::new("inc-1", "ds-1", ScanType::Incremental);
        let (scanner, _store) = setup(backend.clone(), &order).await;
        let result = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(result.files.len(), 2);
        assert_eq!(backend.requests().await[0].updated_since.as_deref(), Some("1970-01-01T00:00:00Z"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_final_save_still_returns_records() {
        let handle: BackendHandle = Arc::new(MockBackend::with_files("0", 10));
        let scanner = scanner(StaticAuthenticator::new(handle), Arc::new(BrokenStore));
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Full);
        let result = scanner.scan(&source("0"), &mut order).await;
        assert_eq!(result.files.len(), 10);
        assert!(!result.is_completed);
        assert_eq!(result.error.as_deref(), Some("persistence failed: database error"));
        assert!(result.stats.scan_completed_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_time_lookup_failure() {
        let handle: BackendHandle = Arc::new(MockBackend::with_files("0", 10));
        let scanner = scanner(StaticAuthenticator::new(handle), Arc::new(BrokenStore));
        let mut order = ScanOrder::new("order-1", "ds-1", ScanType::Incremental);
        let result = scanner.scan(&source("0"), &mut order).await;
        assert!(result.files.is_empty());
        assert_eq!(result.error.as_deref(), Some("persistence failed: database error"));
        assert_eq!(result.stats.api_calls_made, 0);
    }
}
