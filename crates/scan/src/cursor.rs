//! Pagination cursor stored under `scan_metadata.cursor`.
//!
//! The cursor is versionless. Whatever is found in storage is read
//! defensively: anything that isn't a recognisable non-negative number
//! restores to offset zero, which at worst re-emits records (at-least-once)
//! and never skips any.

use boxscan_store::{ScanOrder, ScanOrderStore};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{ErrorKind, Result};

/// Largest offset a stored cursor may hold. Anything beyond is treated as
/// corrupt and restores to zero.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Resumption state for the sweep currently in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Items already emitted by the current, unfinished sweep.
    pub current_offset: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    /// Lower bound the current incremental sweep was started with. Kept so
    /// every batch of one sweep filters the same result set.
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub modified_since: Option<OffsetDateTime>,
}

impl Cursor {
    pub fn new(current_offset: u64) -> Self {
        Self {
            current_offset,
            last_updated: OffsetDateTime::now_utc(),
            modified_since: None,
        }
    }

    pub fn with_modified_since(mut self, modified_since: Option<OffsetDateTime>) -> Self {
        self.modified_since = modified_since;
        self
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).or_raise(|| ErrorKind::Persistence("cannot encode cursor".to_string()))
    }
}

/// Offset to resume from. Never fails.
pub fn restore(blob: Option<&Value>) -> u64 {
    blob.and_then(|cursor| cursor.get("current_offset"))
        .map(offset_from_value)
        .filter(|offset| *offset <= MAX_OFFSET)
        .unwrap_or(0)
}

/// Lower bound pinned by the sweep in progress, if the cursor holds a
/// readable one.
pub fn restore_modified_since(blob: Option<&Value>) -> Option<OffsetDateTime> {
    let text = blob?.get("modified_since")?.as_str()?;
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

fn offset_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(number) => {
            if let Some(offset) = number.as_u64() {
                offset
            } else {
                number.as_f64().map(truncate).unwrap_or(0)
            }
        },
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>().ok().or_else(|| text.parse::<f64>().ok().map(truncate)).unwrap_or(0)
        },
        _ => 0,
    }
}

fn truncate(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 && value <= MAX_OFFSET as f64 {
        value.trunc() as u64
    } else {
        0
    }
}

/// Offset for the next batch: move past this batch, or start over once the
/// sweep is complete.
pub fn advance(offset: u64, batch_size: u64, has_more: bool) -> u64 {
    if has_more { offset.saturating_add(batch_size) } else { 0 }
}

/// Write `cursor` into the scan order and hand it to the store.
///
/// The in-memory scan order is updated even if the store rejects the write,
/// so the caller always sees the offset this batch computed.
pub async fn persist(store: &dyn ScanOrderStore, order: &mut ScanOrder, cursor: Cursor) -> Result<()> {
    let offset = cursor.current_offset;
    let value = cursor.to_value()?;
    order.scan_metadata.cursor = Some(value.clone());
    store.save_cursor(&order.id, &value).await.map_err(ErrorKind::persistence)?;
    tracing::debug!(scan_order = %order.id, offset, "Cursor persisted");
    Ok(())
}
