use crate::models::ScanStats;
use time::OffsetDateTime;

/// Counters for a single scan invocation.
///
/// Created fresh for every batch and threaded through every outbound call,
/// so nothing leaks from one invocation into the next.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanContext {
    pub started_at: OffsetDateTime,
    pub api_calls_made: u64,
    pub api_errors_encountered: u64,
}

impl ScanContext {
    pub fn new() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            api_calls_made: 0,
            api_errors_encountered: 0,
        }
    }

    pub fn record_api_call(&mut self) {
        self.api_calls_made += 1;
    }

    pub fn record_api_error(&mut self) {
        self.api_errors_encountered += 1;
    }

    /// Snapshot the counters as batch statistics.
    pub fn stats(&self, files_count: usize, completed: bool) -> ScanStats {
        let now = OffsetDateTime::now_utc();
        ScanStats {
            files_count: files_count as u64,
            scan_started_at: self.started_at,
            last_scan_batch_at: now,
            scan_completed_at: completed.then_some(now),
            api_calls_made: self.api_calls_made,
            api_errors_encountered: self.api_errors_encountered,
        }
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}
