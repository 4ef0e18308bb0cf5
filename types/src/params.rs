//! Consensus parameters shared by the round adaptor and its collaborators.

use crate::hash::AmendmentId;
use serde::{Deserialize, Serialize};

/// The amendment that enables rounded close times in proposals.
///
/// When the parent ledger has this amendment enabled, positions carry close
/// times snapped to the resolution grid, reducing inter-node disagreement
/// over the close-time field.
pub const FIX_ROUNDED_CLOSE: AmendmentId = AmendmentId([
    0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15,
    0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28, 0x15, 0x28,
    0x15, 0x28,
]);

/// Tunable parameters of the consensus process.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Every `flag_ledger_interval`-th ledger is a flag ledger, the only
    /// point at which fee and amendment votes are collected.
    pub flag_ledger_interval: u32,

    /// Warn about a tracked-but-unincluded transaction every this many
    /// ledgers after it was first proposed.
    pub censorship_warn_interval: u32,

    /// A round whose establish phase exceeds this many milliseconds is
    /// reported to the fee queue as slow.
    pub slow_round_ms: u64,

    /// Minimum time (milliseconds) the open ledger stays open before the
    /// round may close it.
    pub ledger_min_close_ms: u64,

    /// Minimum time (milliseconds) spent establishing before the engine may
    /// declare consensus.
    pub ledger_min_consensus_ms: u64,

    /// Fraction of proposers (in percent) that must share our position
    /// before the round is declared settled.
    pub min_consensus_pct: u32,

    /// How long (seconds) a message fingerprint stays in the suppression
    /// set before it may be relayed again.
    pub suppression_hold_secs: u64,

    /// Whether positions carry rounded close times. Refreshed each round
    /// from the parent ledger's enabled amendments.
    pub use_rounded_close_time: bool,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            flag_ledger_interval: 256,
            censorship_warn_interval: 15,
            slow_round_ms: 5_000,
            ledger_min_close_ms: 2_000,
            ledger_min_consensus_ms: 1_950,
            min_consensus_pct: 80,
            suppression_hold_secs: 300,
            use_rounded_close_time: true,
        }
    }
}

impl ConsensusParams {
    /// Whether `seq` is a flag ledger: the fee/amendment voting boundary.
    pub fn is_flag_ledger(&self, seq: u32) -> bool {
        self.flag_ledger_interval > 0 && seq % self.flag_ledger_interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flag_interval_is_256() {
        let p = ConsensusParams::default();
        assert!(p.is_flag_ledger(256));
        assert!(p.is_flag_ledger(512));
        assert!(!p.is_flag_ledger(255));
        assert!(!p.is_flag_ledger(257));
    }

    #[test]
    fn flag_ledger_zero_interval_never_flags() {
        let p = ConsensusParams {
            flag_ledger_interval: 0,
            ..ConsensusParams::default()
        };
        assert!(!p.is_flag_ledger(256));
    }
}
