//! Staleness policy for cached contact lists
//!
//! Decides between block-and-fetch (no data, or data too old) and
//! serve-then-revalidate (fresh enough to show while a background refresh
//! runs). The in-flight set dedupes background refreshes per key, since
//! the timestamp alone cannot tell "recently refreshed" from "refresh
//! still running".

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

/// True when the caller must fetch synchronously before showing anything:
/// either no fetch has ever completed, or the cached data is at or past
/// the staleness threshold.
pub fn should_block_fetch(
    last_fetched_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold_ms: i64,
) -> bool {
    match last_fetched_at {
        None => true,
        Some(fetched) => (now - fetched).num_milliseconds() >= threshold_ms,
    }
}

/// Marker set for background refreshes currently in flight
pub struct InFlightSet {
    keys: Mutex<HashSet<String>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
        }
    }

    /// Claim a key for a background refresh. Returns false if a refresh
    /// for the key is already running.
    pub fn try_begin(&self, key: &str) -> bool {
        self.keys.lock().unwrap().insert(key.to_string())
    }

    /// Release a key after the refresh completes, successfully or not
    pub fn finish(&self, key: &str) {
        self.keys.lock().unwrap().remove(key);
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }
}

impl Default for InFlightSet {
    fn default() -> Self {
        Self::new()
    }
}
