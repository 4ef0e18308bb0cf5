//! The immutable closed ledger.

use crate::rules::Rules;
use crest_crypto::{sha512_half_multi, HashPrefix};
use crest_types::{CloseResolution, LedgerHash, LedgerIndex, NetTime, TxSetId};

/// A closed ledger. Immutable once built.
///
/// Invariants: `parent.seq + 1 == child.seq` and `parent.hash ==
/// child.parent_hash`. The content hash covers every header field, so two
/// ledgers with the same hash are the same ledger.
#[derive(Clone, Debug)]
pub struct Ledger {
    seq: LedgerIndex,
    parent_hash: LedgerHash,
    tx_set_hash: TxSetId,
    close_time: NetTime,
    close_time_resolution: CloseResolution,
    close_time_correct: bool,
    rules: Rules,
    hash: LedgerHash,
}

impl Ledger {
    /// The genesis ledger: sequence 1, zero parent.
    pub fn genesis(close_time: NetTime, rules: Rules) -> Self {
        Self::make(
            1,
            LedgerHash::ZERO,
            TxSetId::ZERO,
            close_time,
            CloseResolution::INITIAL,
            true,
            rules,
        )
    }

    /// Build the child of `parent` with the given agreed header fields.
    /// Rules carry forward from the parent.
    pub fn build(
        parent: &Ledger,
        tx_set_hash: TxSetId,
        close_time: NetTime,
        close_time_correct: bool,
        close_time_resolution: CloseResolution,
    ) -> Self {
        Self::make(
            parent.seq + 1,
            parent.hash,
            tx_set_hash,
            close_time,
            close_time_resolution,
            close_time_correct,
            parent.rules.clone(),
        )
    }

    fn make(
        seq: LedgerIndex,
        parent_hash: LedgerHash,
        tx_set_hash: TxSetId,
        close_time: NetTime,
        close_time_resolution: CloseResolution,
        close_time_correct: bool,
        rules: Rules,
    ) -> Self {
        let hash = LedgerHash::new(sha512_half_multi(
            HashPrefix::LedgerHeader,
            &[
                &seq.to_be_bytes(),
                parent_hash.as_bytes(),
                tx_set_hash.as_bytes(),
                &close_time.as_secs().to_be_bytes(),
                &close_time_resolution.as_secs().to_be_bytes(),
                &[u8::from(close_time_correct)],
            ],
        ));
        Self {
            seq,
            parent_hash,
            tx_set_hash,
            close_time,
            close_time_resolution,
            close_time_correct,
            rules,
            hash,
        }
    }

    pub fn seq(&self) -> LedgerIndex {
        self.seq
    }

    /// The ledger's identity.
    pub fn id(&self) -> LedgerHash {
        self.hash
    }

    pub fn parent_id(&self) -> LedgerHash {
        self.parent_hash
    }

    pub fn tx_set_hash(&self) -> TxSetId {
        self.tx_set_hash
    }

    pub fn close_time(&self) -> NetTime {
        self.close_time
    }

    pub fn close_time_resolution(&self) -> CloseResolution {
        self.close_time_resolution
    }

    /// Whether the network agreed on this ledger's close time.
    pub fn close_time_correct(&self) -> bool {
        self.close_time_correct
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }
}

impl PartialEq for Ledger {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Ledger {}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: u64) -> NetTime {
        NetTime::from_secs(secs)
    }

    #[test]
    fn genesis_has_seq_one_and_zero_parent() {
        let g = Ledger::genesis(t(100), Rules::default());
        assert_eq!(g.seq(), 1);
        assert_eq!(g.parent_id(), LedgerHash::ZERO);
        assert!(!g.id().is_zero());
    }

    #[test]
    fn build_links_parent_and_increments_seq() {
        let g = Ledger::genesis(t(100), Rules::default());
        let child = Ledger::build(&g, TxSetId::ZERO, t(130), true, CloseResolution::INITIAL);
        assert_eq!(child.seq(), g.seq() + 1);
        assert_eq!(child.parent_id(), g.id());
        assert_ne!(child.id(), g.id());
    }

    #[test]
    fn hash_covers_close_time_correct() {
        let g = Ledger::genesis(t(100), Rules::default());
        let a = Ledger::build(&g, TxSetId::ZERO, t(130), true, CloseResolution::INITIAL);
        let b = Ledger::build(&g, TxSetId::ZERO, t(130), false, CloseResolution::INITIAL);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn rules_carry_forward() {
        let id = crest_types::AmendmentId::new([7u8; 32]);
        let g = Ledger::genesis(t(100), Rules::new([id]));
        let child = Ledger::build(&g, TxSetId::ZERO, t(130), true, CloseResolution::INITIAL);
        assert!(child.rules().enabled(&id));
    }

    #[test]
    fn equality_is_by_hash() {
        let g = Ledger::genesis(t(100), Rules::default());
        let a = Ledger::build(&g, TxSetId::ZERO, t(130), true, CloseResolution::INITIAL);
        let b = Ledger::build(&g, TxSetId::ZERO, t(130), true, CloseResolution::INITIAL);
        assert_eq!(a, b);
    }
}
