//! The local ledger store and validated line.
//!
//! Tracks every ledger this node has seen by hash, the last closed ledger
//! (LCL), the last fully validated ledger, and the round-adjacent state the
//! consensus adaptor needs: the building-ledger marker, held transactions,
//! and the replay slot. Internally synchronized; all methods take `&self`.

use crate::builder::ReplayPayload;
use crate::ledger::Ledger;
use crate::transaction::Transaction;
use crest_types::{LedgerHash, LedgerIndex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct MasterState {
    ledgers: HashMap<LedgerHash, Arc<Ledger>>,
    closed: Arc<Ledger>,
    validated: Option<Arc<Ledger>>,
    building_seq: Option<LedgerIndex>,
    held: Vec<Transaction>,
    replay: Option<ReplayPayload>,
    /// Ledgers at or below this sequence may not be validated (anti-replay
    /// guard loaded at startup).
    max_disallowed_seq: LedgerIndex,
    /// Oldest ledger this node will serve to fetchers.
    earliest_fetch: LedgerIndex,
    /// Contiguous range of fully validated ledgers, if any.
    full_range: Option<(LedgerIndex, LedgerIndex)>,
}

pub struct LedgerMaster {
    state: Mutex<MasterState>,
}

impl LedgerMaster {
    pub fn new(genesis: Arc<Ledger>) -> Self {
        let mut ledgers = HashMap::new();
        ledgers.insert(genesis.id(), Arc::clone(&genesis));
        Self {
            state: Mutex::new(MasterState {
                ledgers,
                closed: genesis,
                validated: None,
                building_seq: None,
                held: Vec::new(),
                replay: None,
                max_disallowed_seq: 0,
                earliest_fetch: 0,
                full_range: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MasterState> {
        self.state.lock().expect("ledger master poisoned")
    }

    pub fn get_ledger_by_hash(&self, hash: &LedgerHash) -> Option<Arc<Ledger>> {
        self.lock().ledgers.get(hash).cloned()
    }

    /// Store a ledger. Returns `true` if it was already present.
    pub fn store_ledger(&self, ledger: Arc<Ledger>) -> bool {
        let mut state = self.lock();
        state.ledgers.insert(ledger.id(), ledger).is_some()
    }

    /// The last closed ledger.
    pub fn closed_ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.lock().closed)
    }

    /// Advance the closed pointer to a newly built ledger.
    pub fn switch_lcl(&self, ledger: Arc<Ledger>) {
        let mut state = self.lock();
        state.ledgers.insert(ledger.id(), Arc::clone(&ledger));
        state.building_seq = None;
        state.closed = ledger;
    }

    pub fn set_validated(&self, ledger: Arc<Ledger>) {
        let mut state = self.lock();
        state.ledgers.insert(ledger.id(), Arc::clone(&ledger));
        let seq = ledger.seq();
        state.validated = Some(ledger);
        state.full_range = Some(match state.full_range {
            Some((lo, hi)) => (lo, hi.max(seq)),
            None => (seq, seq),
        });
    }

    pub fn have_validated(&self) -> bool {
        self.lock().validated.is_some()
    }

    pub fn validated_ledger(&self) -> Option<Arc<Ledger>> {
        self.lock().validated.clone()
    }

    /// Sequence of the last fully validated ledger (0 if none).
    pub fn valid_ledger_index(&self) -> LedgerIndex {
        self.lock().validated.as_ref().map_or(0, |l| l.seq())
    }

    /// Whether a freshly built ledger is compatible with the local validated
    /// line. Walks parent links from the validated ledger back to the built
    /// ledger's sequence; a hash mismatch there means this node has diverged
    /// and must not validate.
    pub fn is_compatible(&self, built: &Ledger) -> bool {
        let state = self.lock();
        let Some(validated) = state.validated.as_ref() else {
            return true;
        };
        if validated.seq() == built.seq() {
            return validated.id() == built.id();
        }
        if validated.seq() < built.seq() {
            // Built extends past the validated line; check the ancestor of
            // the built ledger at the validated sequence if we can reach it.
            let mut cursor = state.ledgers.get(&built.parent_id());
            while let Some(ledger) = cursor {
                if ledger.seq() == validated.seq() {
                    return ledger.id() == validated.id();
                }
                if ledger.seq() < validated.seq() {
                    break;
                }
                cursor = state.ledgers.get(&ledger.parent_id());
            }
            return true;
        }
        // Validated is ahead: walk back to the built sequence.
        let mut cursor = state.ledgers.get(&validated.parent_id());
        while let Some(ledger) = cursor {
            if ledger.seq() == built.seq() {
                return ledger.id() == built.id();
            }
            if ledger.seq() < built.seq() {
                break;
            }
            cursor = state.ledgers.get(&ledger.parent_id());
        }
        true
    }

    /// Mark the sequence currently being built. At most one round may be in
    /// the building phase.
    pub fn set_building_ledger(&self, seq: LedgerIndex) {
        self.lock().building_seq = Some(seq);
    }

    pub fn building_seq(&self) -> Option<LedgerIndex> {
        self.lock().building_seq
    }

    /// Queue a transaction to be flushed into the open ledger when the next
    /// round opens.
    pub fn hold_transaction(&self, tx: Transaction) {
        self.lock().held.push(tx);
    }

    /// Drain the held transactions (called at round open).
    pub fn take_held_transactions(&self) -> Vec<Transaction> {
        std::mem::take(&mut self.lock().held)
    }

    pub fn set_replay(&self, replay: ReplayPayload) {
        self.lock().replay = Some(replay);
    }

    /// Take the replay payload, if one was staged for this round.
    pub fn release_replay(&self) -> Option<ReplayPayload> {
        self.lock().replay.take()
    }

    pub fn max_disallowed_seq(&self) -> LedgerIndex {
        self.lock().max_disallowed_seq
    }

    pub fn set_max_disallowed_seq(&self, seq: LedgerIndex) {
        self.lock().max_disallowed_seq = seq;
    }

    pub fn set_earliest_fetch(&self, seq: LedgerIndex) {
        self.lock().earliest_fetch = seq;
    }

    /// The contiguous fully validated range, clamped below by the earliest
    /// ledger this node will serve.
    pub fn full_validated_range(&self) -> Option<(LedgerIndex, LedgerIndex)> {
        let state = self.lock();
        state
            .full_range
            .map(|(lo, hi)| (lo.max(state.earliest_fetch), hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;
    use crest_types::{AccountId, CloseResolution, NetTime, TxSetId};

    fn genesis() -> Arc<Ledger> {
        Arc::new(Ledger::genesis(NetTime::from_secs(100), Rules::default()))
    }

    fn child_of(parent: &Ledger, tag: u8) -> Arc<Ledger> {
        Arc::new(Ledger::build(
            parent,
            TxSetId::new([tag; 32]),
            parent.close_time() + 10,
            true,
            CloseResolution::INITIAL,
        ))
    }

    #[test]
    fn new_master_holds_genesis_as_closed() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        assert_eq!(master.closed_ledger().id(), g.id());
        assert!(master.get_ledger_by_hash(&g.id()).is_some());
        assert!(!master.have_validated());
        assert_eq!(master.valid_ledger_index(), 0);
    }

    #[test]
    fn store_reports_duplicates() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        let child = child_of(&g, 1);
        assert!(!master.store_ledger(Arc::clone(&child)));
        assert!(master.store_ledger(child));
    }

    #[test]
    fn switch_lcl_advances_closed_and_clears_building() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        master.set_building_ledger(2);
        let child = child_of(&g, 1);
        master.switch_lcl(Arc::clone(&child));
        assert_eq!(master.closed_ledger().id(), child.id());
        assert_eq!(master.building_seq(), None);
    }

    #[test]
    fn compatible_when_nothing_validated() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        let child = child_of(&g, 1);
        assert!(master.is_compatible(&child));
    }

    #[test]
    fn incompatible_sibling_of_validated() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        let a = child_of(&g, 1);
        let b = child_of(&g, 2);
        master.set_validated(Arc::clone(&a));
        assert!(master.is_compatible(&a));
        assert!(!master.is_compatible(&b));
    }

    #[test]
    fn compatible_descendant_of_validated() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        let a = child_of(&g, 1);
        master.set_validated(Arc::clone(&a));
        let grandchild = child_of(&a, 3);
        assert!(master.is_compatible(&grandchild));
    }

    #[test]
    fn incompatible_fork_below_validated() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        let a = child_of(&g, 1);
        let a2 = child_of(&a, 2);
        master.store_ledger(Arc::clone(&a));
        master.set_validated(Arc::clone(&a2));
        // A sibling of `a` conflicts with the validated line at its seq.
        let b = child_of(&g, 9);
        assert!(!master.is_compatible(&b));
    }

    #[test]
    fn held_transactions_drain_once() {
        let g = genesis();
        let master = LedgerMaster::new(g);
        master.hold_transaction(Transaction::new(AccountId::new([1; 32]), 1, vec![]));
        assert_eq!(master.take_held_transactions().len(), 1);
        assert!(master.take_held_transactions().is_empty());
    }

    #[test]
    fn replay_slot_releases_once() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        master.set_replay(ReplayPayload {
            parent_hash: g.id(),
            txs: vec![],
            close_time: NetTime::from_secs(130),
            close_time_correct: true,
            close_time_resolution: CloseResolution::INITIAL,
        });
        assert!(master.release_replay().is_some());
        assert!(master.release_replay().is_none());
    }

    #[test]
    fn full_range_tracks_validated_and_clamps() {
        let g = genesis();
        let master = LedgerMaster::new(Arc::clone(&g));
        assert_eq!(master.full_validated_range(), None);
        let a = child_of(&g, 1);
        let a2 = child_of(&a, 2);
        master.set_validated(a);
        master.set_validated(a2);
        assert_eq!(master.full_validated_range(), Some((2, 3)));
        master.set_earliest_fetch(3);
        assert_eq!(master.full_validated_range(), Some((3, 3)));
    }
}
