//! Deterministic clock for testing — time only advances when told to.

use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic clock, readable from any thread.
pub struct TestClock {
    current_unix_secs: AtomicU64,
}

impl TestClock {
    pub fn new(initial_unix_secs: u64) -> Self {
        Self {
            current_unix_secs: AtomicU64::new(initial_unix_secs),
        }
    }

    /// The current time, in Unix seconds.
    pub fn now_unix_secs(&self) -> u64 {
        self.current_unix_secs.load(Ordering::SeqCst)
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: u64) {
        self.current_unix_secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, unix_secs: u64) {
        self.current_unix_secs.store(unix_secs, Ordering::SeqCst);
    }
}
