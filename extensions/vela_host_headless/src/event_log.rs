//! Shared in-memory event log
//!
//! The headless host's observable output: trigger handlers append one line
//! per handled event, and tests read the log back instead of inspecting a
//! frame buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Capacity-bounded, append-only log shared between the host's handlers
/// and whoever is observing the run. Cloning shares the same buffer.
#[derive(Clone)]
pub struct EventLog {
    entries: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl EventLog {
    /// A log retaining at most `capacity` entries; the oldest drop first
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, entry: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.into());
    }

    /// Snapshot of the retained entries, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let log = EventLog::new(8);
        assert!(log.is_empty());
        log.record("first");
        log.record("second");
        assert_eq!(log.entries(), vec!["first", "second"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = EventLog::new(2);
        log.record("a");
        log.record("b");
        log.record("c");
        assert_eq!(log.entries(), vec!["b", "c"]);
    }

    #[test]
    fn test_clones_share_the_buffer() {
        let log = EventLog::new(4);
        let writer = log.clone();
        writer.record("shared");
        assert_eq!(log.entries(), vec!["shared"]);

        log.clear();
        assert!(writer.is_empty());
    }
}
