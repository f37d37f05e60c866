use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;

/// Persistence the scan engine needs between batches.
///
/// The engine only ever touches the `cursor` key of a scan order's metadata;
/// implementations must leave every other key as they found it.
#[async_trait]
pub trait ScanOrderStore: Send + Sync {
    /// Stored cursor blob for a scan order, if one has been saved.
    async fn load_cursor(&self, scan_order_id: &str) -> Result<Option<Value>>;

    /// Replace the cursor blob for a scan order.
    async fn save_cursor(&self, scan_order_id: &str, cursor: &Value) -> Result<()>;

    /// Completion time of the most recent finished scan for a data source.
    async fn last_completed_scan_timestamp(&self, data_source_id: &str) -> Result<Option<OffsetDateTime>>;
}
