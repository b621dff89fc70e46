//! Sliding-window escalation of repeated distractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Normal,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Trailing window of distraction timestamps
///
/// Entries are kept while `now - timestamp <= window`, so an entry exactly one
/// window old still counts. The window is always pruned before it is read.
#[derive(Debug, Clone)]
pub struct SeverityTracker {
    window: chrono::Duration,
    threshold: usize,
    entries: VecDeque<DateTime<Utc>>,
}

impl SeverityTracker {
    #[must_use]
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
            threshold,
            entries: VecDeque::new(),
        }
    }

    /// Record a distraction at `now` and return the resulting severity
    pub fn record_at(&mut self, now: DateTime<Utc>) -> Severity {
        // Keep the deque ordered even if the wall clock steps backwards
        let timestamp = match self.entries.back() {
            Some(last) if *last > now => *last,
            _ => now,
        };
        self.entries.push_back(timestamp);
        self.severity_at(now)
    }

    pub fn severity_at(&mut self, now: DateTime<Utc>) -> Severity {
        if self.count_at(now) > self.threshold {
            Severity::Critical
        } else {
            Severity::Normal
        }
    }

    /// Distractions inside the window ending at `now`
    pub fn count_at(&mut self, now: DateTime<Utc>) -> usize {
        self.prune(now);
        self.entries.len()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(timestamp) = self.entries.front() {
            if now.signed_duration_since(*timestamp) > self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn default_tracker() -> SeverityTracker {
        SeverityTracker::new(Duration::from_secs(60), 3)
    }

    #[test]
    fn test_fourth_distraction_in_window_is_critical() {
        let mut tracker = default_tracker();
        assert_eq!(tracker.record_at(at(0)), Severity::Normal);
        assert_eq!(tracker.record_at(at(10)), Severity::Normal);
        assert_eq!(tracker.record_at(at(20)), Severity::Normal);
        assert_eq!(tracker.record_at(at(30)), Severity::Critical);
    }

    #[test]
    fn test_window_edge_is_inclusive() {
        let mut tracker = default_tracker();
        for secs in [0, 20, 40] {
            tracker.record_at(at(secs));
        }
        // First entry is exactly 60s old and still counts
        assert_eq!(tracker.record_at(at(60)), Severity::Critical);

        let mut tracker = default_tracker();
        for secs in [0, 20, 40] {
            tracker.record_at(at(secs));
        }
        // One second later it has aged out
        assert_eq!(tracker.record_at(at(61)), Severity::Normal);
        assert_eq!(tracker.count_at(at(61)), 3);
    }

    #[test]
    fn test_reads_prune_lazily() {
        let mut tracker = default_tracker();
        for secs in [0, 1, 2, 3] {
            tracker.record_at(at(secs));
        }
        assert_eq!(tracker.severity_at(at(30)), Severity::Critical);
        assert_eq!(tracker.severity_at(at(62)), Severity::Normal);
        assert_eq!(tracker.count_at(at(63)), 1);
        assert_eq!(tracker.count_at(at(200)), 0);
    }

    #[test]
    fn test_backwards_clock_keeps_order() {
        let mut tracker = default_tracker();
        tracker.record_at(at(50));
        tracker.record_at(at(40));
        // Both entries are treated as t=50 and survive until t=110
        assert_eq!(tracker.count_at(at(110)), 2);
        assert_eq!(tracker.count_at(at(111)), 0);
    }

    #[test]
    fn test_reset_clears_window() {
        let mut tracker = default_tracker();
        for secs in 0..5 {
            tracker.record_at(at(secs));
        }
        tracker.reset();
        assert_eq!(tracker.severity_at(at(5)), Severity::Normal);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let mut tracker = SeverityTracker::new(Duration::from_secs(60), 1);
        tracker.record_at(at(0));
        assert_eq!(tracker.record_at(at(1)), Severity::Critical);
    }
}
