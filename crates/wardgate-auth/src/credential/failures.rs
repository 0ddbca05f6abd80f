//! Sliding-window failed-login counters shared by the realm router and
//! the anomaly detector.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// What a failure is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureKey {
    Identifier(String),
    Ip(String),
}

/// Per-key timestamps of recent failures. Each key's window is mutated
/// under its map entry lock.
#[derive(Debug)]
pub struct FailureTracker {
    window: Duration,
    entries: DashMap<FailureKey, VecDeque<DateTime<Utc>>>,
}

impl FailureTracker {
    /// Create a tracker counting failures within `window`.
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or(Duration::MAX),
            entries: DashMap::new(),
        }
    }

    /// Record one failure at `at` and return how many fall within the window.
    pub fn record(&self, key: FailureKey, at: DateTime<Utc>) -> usize {
        let mut times = self.entries.entry(key).or_default();
        times.push_back(at);
        Self::prune(&mut times, at - self.window);
        times.len()
    }

    /// Failures within the window ending at `now`.
    pub fn count(&self, key: &FailureKey, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        self.entries
            .get(key)
            .map(|times| times.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0)
    }

    /// Drop windows with no failure newer than the cutoff.
    pub fn purge(&self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.entries.retain(|_, times| {
            Self::prune(times, cutoff);
            !times.is_empty()
        });
    }

    fn prune(times: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
        while times.front().is_some_and(|t| *t <= cutoff) {
            times.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_slides() {
        let tracker = FailureTracker::new(std::time::Duration::from_secs(3600));
        let t0 = Utc::now();
        let key = FailureKey::Identifier("0800".to_string());

        assert_eq!(tracker.record(key.clone(), t0), 1);
        assert_eq!(tracker.record(key.clone(), t0 + Duration::minutes(30)), 2);
        assert_eq!(tracker.record(key.clone(), t0 + Duration::minutes(61)), 2);
        assert_eq!(tracker.count(&key, t0 + Duration::minutes(125)), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = FailureTracker::new(std::time::Duration::from_secs(60));
        let now = Utc::now();
        tracker.record(FailureKey::Ip("10.0.0.1".to_string()), now);
        assert_eq!(
            tracker.count(&FailureKey::Identifier("10.0.0.1".to_string()), now),
            0
        );
    }

    #[test]
    fn test_purge() {
        let tracker = FailureTracker::new(std::time::Duration::from_secs(60));
        let now = Utc::now();
        tracker.record(FailureKey::Ip("a".to_string()), now);
        tracker.purge(now + Duration::minutes(2));
        assert!(tracker.entries.is_empty());
    }
}
