//! The network-operations module: the node's operating mode and the
//! signals consensus sends it.

use crest_consensus::NetOps;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// How synced this node is with the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperatingMode {
    /// Not connected to any peers.
    Disconnected,
    /// Connected but not tracking the network.
    Connected,
    /// Downloading history.
    Syncing,
    /// Following the network without a full validated line.
    Tracking,
    /// Fully synced.
    Full,
}

pub struct NetworkOps {
    mode: Mutex<OperatingMode>,
    amendment_blocked: AtomicBool,
    view_changes: AtomicU64,
    consensus_ends: AtomicU64,
}

impl NetworkOps {
    pub fn new(mode: OperatingMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            amendment_blocked: AtomicBool::new(false),
            view_changes: AtomicU64::new(0),
            consensus_ends: AtomicU64::new(0),
        }
    }

    pub fn operating_mode(&self) -> OperatingMode {
        *self.mode.lock().expect("network ops poisoned")
    }

    pub fn set_operating_mode(&self, mode: OperatingMode) {
        let mut current = self.mode.lock().expect("network ops poisoned");
        if *current != mode {
            tracing::info!(from = ?*current, to = ?mode, "operating mode change");
            *current = mode;
        }
    }

    /// Latch the amendment-blocked state: the network activated an
    /// amendment this node does not understand, so it must not validate.
    pub fn set_amendment_blocked(&self) {
        self.amendment_blocked.store(true, Ordering::SeqCst);
        tracing::error!("node is amendment-blocked: refusing to validate");
    }

    pub fn view_changes(&self) -> u64 {
        self.view_changes.load(Ordering::SeqCst)
    }

    pub fn consensus_ends(&self) -> u64 {
        self.consensus_ends.load(Ordering::SeqCst)
    }
}

impl NetOps for NetworkOps {
    fn consensus_view_change(&self) {
        self.view_changes.fetch_add(1, Ordering::SeqCst);
        tracing::warn!("consensus view change: previous ledger disagreement");
    }

    fn end_consensus(&self) {
        self.consensus_ends.fetch_add(1, Ordering::SeqCst);
    }

    fn is_amendment_blocked(&self) -> bool {
        self.amendment_blocked.load(Ordering::SeqCst)
    }

    fn is_full(&self) -> bool {
        self.operating_mode() == OperatingMode::Full
    }
}
