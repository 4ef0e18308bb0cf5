//! Consensus participation modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How this node is participating in the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusMode {
    /// Emitting proposals and steering the round.
    Proposing,
    /// Following the round without proposing.
    Observing,
    /// Our previous ledger differs from the network's preferred one.
    WrongLedger,
    /// We acquired the network's ledger mid-round after being wrong.
    SwitchedLedger,
}

impl ConsensusMode {
    /// Whether this mode participates (proposing or observing).
    pub fn participating(&self) -> bool {
        matches!(self, ConsensusMode::Proposing | ConsensusMode::Observing)
    }

    /// Whether this node agrees with the network about the previous ledger.
    pub fn correct_lcl(&self) -> bool {
        !matches!(self, ConsensusMode::WrongLedger)
    }
}

impl fmt::Display for ConsensusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsensusMode::Proposing => "proposing",
            ConsensusMode::Observing => "observing",
            ConsensusMode::WrongLedger => "wrongLedger",
            ConsensusMode::SwitchedLedger => "switchedLedger",
        };
        write!(f, "{s}")
    }
}
