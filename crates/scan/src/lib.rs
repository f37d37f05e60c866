//! Resumable, batched scans of a Box folder tree.
//!
//! A scan is driven one batch at a time by [`Scanner::scan`]: authenticate,
//! restore the pagination cursor from the scan order, fetch exactly one
//! window of search results (retrying transient failures), normalize the
//! entries, and persist the offset the next batch should start from.
//!
//! # Modules
//! - [`cursor`]: restoring, advancing and persisting the pagination offset
//! - [`retry`]: classification-driven exponential backoff
//! - [`walk`]: the single-window folder walker
//! - [`Scanner`]: the orchestrator tying it all together

mod context;
pub mod cursor;
pub mod error;
mod models;
pub mod retry;
mod scan;
pub mod walk;

pub use crate::context::ScanContext;
pub use crate::cursor::Cursor;
pub use crate::models::{ScanResult, ScanStats};
pub use crate::retry::RetryPolicy;
pub use crate::scan::{DEFAULT_MAX_BATCH_SIZE, ScanOptions, Scanner};
