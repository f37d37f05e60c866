//! Scan order repository backed by SQLite.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{ScanMetadata, ScanOrder, ScanOrderRow, ScanStatus};
use crate::store::ScanOrderStore;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use serde_json::Value;
use sqlx::SqlitePool;
use time::OffsetDateTime;

/// Repository for scan orders.
///
/// Scan metadata is stored as a JSON document. Cursor writes go through
/// SQLite's `json_set` so concurrent edits to other metadata keys survive.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new scan order.
    ///
    /// Returns [`ErrorKind::ScanOrderExists`] if the identifier is taken.
    pub async fn create(&self, order: &ScanOrder) -> Result<()> {
        let row = ScanOrderRow::try_from(order)?;
        let result = sqlx::query(include_str!("../queries/insert_scan_order.sql"))
            .bind(row.id)
            .bind(row.data_source_id)
            .bind(row.scan_type)
            .bind(row.scanned_from)
            .bind(row.scan_metadata)
            .bind(row.status)
            .bind(row.created_at)
            .bind(row.completed_at)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
                Err(err).or_raise(|| ErrorKind::ScanOrderExists(order.id.clone()))
            },
            Err(err) => Err(err).or_raise(|| ErrorKind::Database),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScanOrder>> {
        let row: Option<ScanOrderRow> = sqlx::query_as(include_str!("../queries/get_scan_order.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(ScanOrder::try_from).transpose()
    }

    /// Mark a scan order as finished at the given time.
    pub async fn mark_completed(&self, id: &str, completed_at: OffsetDateTime) -> Result<()> {
        let result = sqlx::query("UPDATE scan_orders SET status = ?, completed_at = ? WHERE id = ?")
            .bind(ScanStatus::Completed.as_str())
            .bind(completed_at.unix_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ScanOrderNotFound(id.to_string()));
        }
        tracing::debug!(scan_order = id, "Scan order marked completed");
        Ok(())
    }
}

#[async_trait]
impl ScanOrderStore for Repository {
    async fn load_cursor(&self, scan_order_id: &str) -> Result<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT scan_metadata FROM scan_orders WHERE id = ?")
            .bind(scan_order_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let raw = raw.ok_or_raise(|| ErrorKind::ScanOrderNotFound(scan_order_id.to_string()))?;
        let metadata: ScanMetadata =
            serde_json::from_str(&raw).or_raise(|| ErrorKind::InvalidData("scan metadata"))?;
        Ok(metadata.cursor)
    }

    async fn save_cursor(&self, scan_order_id: &str, cursor: &Value) -> Result<()> {
        let cursor = serde_json::to_string(cursor).or_raise(|| ErrorKind::InvalidData("cursor"))?;
        let result = sqlx::query(include_str!("../queries/save_cursor.sql"))
            .bind(cursor)
            .bind(scan_order_id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ScanOrderNotFound(scan_order_id.to_string()));
        }
        Ok(())
    }

    async fn last_completed_scan_timestamp(&self, data_source_id: &str) -> Result<Option<OffsetDateTime>> {
        let latest: Option<i64> = sqlx::query_scalar(include_str!("../queries/last_completed_scan.sql"))
            .bind(data_source_id)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        latest
            .map(|ts| OffsetDateTime::from_unix_timestamp(ts).or_raise(|| ErrorKind::InvalidData("completed at")))
            .transpose()
    }
}
