//! Expiry Timer Module
//!
//! At most one pending deadline per key, kept while a binding on that key is
//! alive. Timers only keep local bindings accurate; expiry correctness comes
//! from the lazy check on every read.

use std::collections::{BTreeSet, HashMap};

/// Deadline queue keyed by cache key.
#[derive(Debug, Default)]
pub struct ExpiryTimers {
    by_key: HashMap<String, u64>,
    queue: BTreeSet<(u64, String)>,
}

impl ExpiryTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules (or moves) the timer for `key` to `deadline_ms`.
    pub fn schedule(&mut self, key: &str, deadline_ms: u64) {
        self.cancel(key);
        self.by_key.insert(key.to_string(), deadline_ms);
        self.queue.insert((deadline_ms, key.to_string()));
    }

    /// Cancels the timer for `key`. Returns whether one was pending.
    pub fn cancel(&mut self, key: &str) -> bool {
        match self.by_key.remove(key) {
            Some(deadline) => {
                self.queue.remove(&(deadline, key.to_string()));
                true
            }
            None => false,
        }
    }

    /// Removes and returns every key whose deadline is at or before `now_ms`,
    /// earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<String> {
        let mut due = Vec::new();
        while let Some((deadline, _)) = self.queue.first() {
            if *deadline > now_ms {
                break;
            }
            if let Some((_, key)) = self.queue.pop_first() {
                self.by_key.remove(&key);
                due.push(key);
            }
        }
        due
    }

    /// Deadline for `key`, if scheduled.
    pub fn deadline(&self, key: &str) -> Option<u64> {
        self.by_key.get(key).copied()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.first().map(|(deadline, _)| *deadline)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
