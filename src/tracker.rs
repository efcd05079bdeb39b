// src/tracker.rs
use std::collections::HashSet;

/// Session-scoped dedup authority: incident ids that already produced an alert.
/// - Starts empty, never evicts, never persisted.
/// - Mutated only after a confirmed push send (see `notify::Notifier`).
#[derive(Debug, Clone, Default)]
pub struct NotificationTracker {
    notified: HashSet<String>,
}

impl NotificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_notified(&self, incident_id: &str) -> bool {
        self.notified.contains(incident_id)
    }

    /// Idempotent: marking an id twice leaves the count unchanged.
    pub fn mark_notified(&mut self, incident_id: &str) {
        if self.notified.insert(incident_id.to_string()) {
            tracing::debug!(incident = incident_id, "marked incident as notified");
        }
    }

    pub fn count(&self) -> usize {
        self.notified.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_is_empty() {
        let t = NotificationTracker::new();
        assert_eq!(t.count(), 0);
        assert!(!t.has_notified("2025-00192513"));
    }

    #[test]
    fn marking_twice_counts_once() {
        let mut t = NotificationTracker::new();
        t.mark_notified("2025-00192513");
        assert!(t.has_notified("2025-00192513"));
        assert_eq!(t.count(), 1);

        t.mark_notified("2025-00192513");
        assert!(t.has_notified("2025-00192513"));
        assert_eq!(t.count(), 1);
    }

    #[test]
    fn count_never_decreases() {
        let mut t = NotificationTracker::new();
        let mut last = 0;
        for id in ["a", "b", "a", "c", "b"] {
            t.mark_notified(id);
            assert!(t.count() >= last);
            last = t.count();
        }
        assert_eq!(last, 3);
    }
}
