//! # Conflict Debouncer
//!
//! Key-scoped cooldown that keeps "already exists" handling from repeating on
//! every resync. Shared by all reconcilers in the process.

use super::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct ConflictDebouncer {
    clock: Arc<dyn Clock>,
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl std::fmt::Debug for ConflictDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.last_fired.lock().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("ConflictDebouncer")
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}

impl ConflictDebouncer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Key identifying one side-effect of one record, e.g. `<uid>-bucket`
    pub fn key(uid: &str, tag: &str) -> String {
        format!("{uid}-{tag}")
    }

    /// Run `on_first` unless `key` fired less than `window` ago
    ///
    /// Returns whether `on_first` ran. The lock is released before
    /// `on_first` is invoked.
    pub fn debounce(&self, key: &str, window: Duration, on_first: impl FnOnce()) -> bool {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);

        let fire = {
            let mut last_fired = self.last_fired.lock().unwrap_or_else(|e| e.into_inner());
            let due = match last_fired.get(key) {
                Some(last) => now.signed_duration_since(*last) >= window,
                None => true,
            };
            if due {
                last_fired.insert(key.to_string(), now);
            }
            due
        };

        if fire {
            on_first();
        }
        fire
    }

    pub fn last_fired(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_fired
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }

    /// Forget every key
    pub fn reset(&self) {
        self.last_fired
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
