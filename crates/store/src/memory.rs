//! In-memory scan order store for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{ScanOrder, ScanStatus};
use crate::store::ScanOrderStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// Scan orders held in a map, mirroring the SQLite repository's behaviour
/// without touching the clock-sensitive connection pool.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<String, ScanOrder>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: ScanOrder) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    pub async fn get(&self, id: &str) -> Option<ScanOrder> {
        self.orders.read().await.get(id).cloned()
    }

    pub async fn mark_completed(&self, id: &str, completed_at: OffsetDateTime) -> Result<()> {
        let mut guard = self.orders.write().await;
        let order = guard.get_mut(id).ok_or_else(|| exn::Exn::from(ErrorKind::ScanOrderNotFound(id.to_string())))?;
        order.status = ScanStatus::Completed;
        order.completed_at = Some(completed_at);
        Ok(())
    }
}

#[async_trait]
impl ScanOrderStore for MemoryStore {
    async fn load_cursor(&self, scan_order_id: &str) -> Result<Option<Value>> {
        let guard = self.orders.read().await;
        let order = guard
            .get(scan_order_id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::ScanOrderNotFound(scan_order_id.to_string())))?;
        Ok(order.scan_metadata.cursor.clone())
    }

    async fn save_cursor(&self, scan_order_id: &str, cursor: &Value) -> Result<()> {
        let mut guard = self.orders.write().await;
        let order = guard
            .get_mut(scan_order_id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::ScanOrderNotFound(scan_order_id.to_string())))?;
        order.scan_metadata.cursor = Some(cursor.clone());
        Ok(())
    }

    async fn last_completed_scan_timestamp(&self, data_source_id: &str) -> Result<Option<OffsetDateTime>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.data_source_id == data_source_id && order.is_completed())
            .filter_map(|order| order.completed_at)
            .max())
    }
}
