//! Consecutive credential refresh failure tracking, reported by health.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Tracks consecutive failures of one recurring operation.
#[derive(Default)]
pub struct RefreshFailureTracker {
    record: Mutex<Option<FailureInfo>>,
}

/// Information about the current failure streak.
#[derive(Debug, Clone, Serialize)]
pub struct FailureInfo {
    /// Number of consecutive failures.
    pub count: u32,
    /// Time of first failure in this sequence.
    pub first_failure: DateTime<Utc>,
    /// Time of most recent failure.
    pub last_failure: DateTime<Utc>,
    /// Error message from last failure.
    pub last_error: String,
}

impl RefreshFailureTracker {
    /// Create a new failure tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return the updated count.
    pub fn record_failure(&self, error: &str) -> u32 {
        let now = Utc::now();
        let mut record = self.record.lock();
        let info = record.get_or_insert_with(|| FailureInfo {
            count: 0,
            first_failure: now,
            last_failure: now,
            last_error: String::new(),
        });

        info.count += 1;
        info.last_failure = now;
        info.last_error = error.to_string();
        info.count
    }

    /// Clear failures on success.
    pub fn clear(&self) {
        *self.record.lock() = None;
    }

    /// Get current failure count.
    pub fn failure_count(&self) -> u32 {
        self.record.lock().as_ref().map(|r| r.count).unwrap_or(0)
    }

    /// Get the current failure streak, if any.
    pub fn failure_info(&self) -> Option<FailureInfo> {
        self.record.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_tracker_counts() {
        let tracker = RefreshFailureTracker::new();
        assert_eq!(tracker.failure_count(), 0);
        assert!(tracker.failure_info().is_none());

        tracker.record_failure("Network error");
        assert_eq!(tracker.failure_count(), 1);

        assert_eq!(tracker.record_failure("Network error again"), 2);
        let info = tracker.failure_info().unwrap();
        assert_eq!(info.last_error, "Network error again");
        assert!(info.first_failure <= info.last_failure);

        // Clear on success
        tracker.clear();
        assert_eq!(tracker.failure_count(), 0);
    }
}
