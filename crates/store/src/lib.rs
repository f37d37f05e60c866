//! SQLite persistence for scan orders.
//!
//! A scan order is a job record: which data source to scan, full or
//! incremental, and free-form metadata. The scan engine keeps its resumption
//! cursor under the `cursor` key of that metadata and never reads or writes
//! anything else, which is what the [`ScanOrderStore`] trait captures.

mod db;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod memory;
mod models;
mod repo;
mod store;

pub use crate::db::Database;
#[cfg(any(test, feature = "mock"))]
pub use crate::memory::MemoryStore;
pub use crate::models::{ScanMetadata, ScanOrder, ScanStatus, ScanType};
pub use crate::repo::Repository;
pub use crate::store::ScanOrderStore;
