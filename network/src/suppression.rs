//! The hash router: message suppression by content fingerprint.
//!
//! Nodes fingerprint everything they observe or originate. A fingerprint in
//! the set suppresses re-processing, and [`HashRouter::should_relay`] grants
//! at most one relay per fingerprint per hold window. Entries age out after
//! the hold time. Internally synchronized.

use std::collections::HashMap;
use std::sync::Mutex;

/// Default hold time for a suppression entry, in seconds.
pub const DEFAULT_HOLD_SECS: u64 = 300;

struct Entry {
    first_seen_secs: u64,
    relayed_at_secs: Option<u64>,
}

/// Time-windowed suppression set, safe for concurrent use.
pub struct HashRouter {
    hold_secs: u64,
    entries: Mutex<HashMap<[u8; 32], Entry>>,
}

impl HashRouter {
    pub fn new(hold_secs: u64) -> Self {
        Self {
            hold_secs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<[u8; 32], Entry>> {
        self.entries.lock().expect("hash router poisoned")
    }

    /// Record a fingerprint. Returns `true` if it was not already present
    /// (i.e. this is the first sighting within the hold window).
    pub fn add_suppression(&self, key: [u8; 32], now_secs: u64) -> bool {
        let mut entries = self.lock();
        Self::expire_locked(&mut entries, self.hold_secs, now_secs);
        match entries.get(&key) {
            Some(_) => false,
            None => {
                entries.insert(
                    key,
                    Entry {
                        first_seen_secs: now_secs,
                        relayed_at_secs: None,
                    },
                );
                true
            }
        }
    }

    /// Whether this fingerprint has been seen within the hold window.
    pub fn is_suppressed(&self, key: &[u8; 32], now_secs: u64) -> bool {
        let mut entries = self.lock();
        Self::expire_locked(&mut entries, self.hold_secs, now_secs);
        entries.contains_key(key)
    }

    /// Grant at most one relay per fingerprint per hold window. Returns
    /// `true` if the caller should relay now.
    pub fn should_relay(&self, key: [u8; 32], now_secs: u64) -> bool {
        let mut entries = self.lock();
        Self::expire_locked(&mut entries, self.hold_secs, now_secs);
        let entry = entries.entry(key).or_insert(Entry {
            first_seen_secs: now_secs,
            relayed_at_secs: None,
        });
        if entry.relayed_at_secs.is_some() {
            return false;
        }
        entry.relayed_at_secs = Some(now_secs);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn expire_locked(entries: &mut HashMap<[u8; 32], Entry>, hold_secs: u64, now_secs: u64) {
        entries.retain(|_, e| now_secs.saturating_sub(e.first_seen_secs) < hold_secs);
    }
}

impl Default for HashRouter {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_add_is_new() {
        let router = HashRouter::new(300);
        assert!(router.add_suppression([1; 32], 100));
        assert!(!router.add_suppression([1; 32], 101));
    }

    #[test]
    fn suppression_expires_after_hold() {
        let router = HashRouter::new(300);
        router.add_suppression([1; 32], 100);
        assert!(router.is_suppressed(&[1; 32], 399));
        assert!(!router.is_suppressed(&[1; 32], 400));
        // After expiry the fingerprint counts as new again.
        assert!(router.add_suppression([1; 32], 401));
    }

    #[test]
    fn relay_granted_once_per_window() {
        let router = HashRouter::new(300);
        assert!(router.should_relay([2; 32], 100));
        assert!(!router.should_relay([2; 32], 150));
        assert!(!router.should_relay([2; 32], 399));
        // New window, new grant.
        assert!(router.should_relay([2; 32], 400));
    }

    #[test]
    fn add_then_relay_still_grants_one_relay() {
        let router = HashRouter::new(300);
        router.add_suppression([3; 32], 100);
        assert!(router.should_relay([3; 32], 120));
        assert!(!router.should_relay([3; 32], 130));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let router = HashRouter::new(300);
        assert!(router.should_relay([1; 32], 100));
        assert!(router.should_relay([2; 32], 100));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn expiry_prunes_entries() {
        let router = HashRouter::new(10);
        router.add_suppression([1; 32], 100);
        router.add_suppression([2; 32], 105);
        router.add_suppression([3; 32], 112);
        assert_eq!(router.len(), 2); // [1] expired at 110
    }
}
