//! Counters for the consensus pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// The events the node counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    /// Rounds opened via `start_round`.
    RoundsStarted,
    /// Rounds that reached acceptance.
    RoundsAccepted,
    /// Peer proposals received from the overlay.
    ProposalsIn,
    /// Peer validations accepted into the validation store.
    ValidationsIn,
}

impl Counter {
    const ALL: [Counter; 4] = [
        Counter::RoundsStarted,
        Counter::RoundsAccepted,
        Counter::ProposalsIn,
        Counter::ValidationsIn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::RoundsStarted => "rounds_started",
            Counter::RoundsAccepted => "rounds_accepted",
            Counter::ProposalsIn => "proposals_in",
            Counter::ValidationsIn => "validations_in",
        }
    }
}

/// Lock-free counts of consensus activity.
///
/// One atomic slot per [`Counter`]; recording is wait-free and safe from
/// the round lock, the accept worker, and inbound message handlers alike.
pub struct ConsensusStats {
    counts: [AtomicU64; Counter::ALL.len()],
}

impl ConsensusStats {
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Record one occurrence of an event.
    pub fn record(&self, counter: Counter) {
        self.counts[counter as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, counter: Counter) -> u64 {
        self.counts[counter as usize].load(Ordering::Relaxed)
    }

    /// All counters with their wire-stable names, in declaration order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        Counter::ALL
            .iter()
            .map(|&c| (c.name(), self.count(c)))
            .collect()
    }
}

impl Default for ConsensusStats {
    fn default() -> Self {
        Self::new()
    }
}
