//! Local and cluster fee-load tracking.
//!
//! Validations advertise a load fee when this node (or its cluster) is
//! charging more than the base fee level. The policy that raises the local
//! fee lives elsewhere; consensus only reads the current levels.

use std::sync::atomic::{AtomicU32, Ordering};

/// The base fee level: no load escalation.
pub const LOAD_BASE: u32 = 256;

pub struct LoadFeeTrack {
    local_fee: AtomicU32,
    cluster_fee: AtomicU32,
}

impl LoadFeeTrack {
    pub fn new() -> Self {
        Self {
            local_fee: AtomicU32::new(LOAD_BASE),
            cluster_fee: AtomicU32::new(0),
        }
    }

    pub fn local_fee(&self) -> u32 {
        self.local_fee.load(Ordering::SeqCst)
    }

    pub fn cluster_fee(&self) -> u32 {
        self.cluster_fee.load(Ordering::SeqCst)
    }

    pub fn set_local_fee(&self, fee: u32) {
        self.local_fee.store(fee, Ordering::SeqCst);
    }

    pub fn set_cluster_fee(&self, fee: u32) {
        self.cluster_fee.store(fee, Ordering::SeqCst);
    }

    /// The fee to advertise in a validation: the higher of the local and
    /// cluster fees, but only when it exceeds the base level.
    pub fn load_fee(&self) -> Option<u32> {
        let fee = self.local_fee().max(self.cluster_fee());
        (fee > LOAD_BASE).then_some(fee)
    }
}

impl Default for LoadFeeTrack {
    fn default() -> Self {
        Self::new()
    }
}
