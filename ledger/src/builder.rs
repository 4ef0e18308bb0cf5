//! Building the next ledger from an agreed transaction set.

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::transaction::{CanonicalTxSet, Transaction};
use crate::tx_set::TxSetBuilder;
use crest_types::{AccountId, CloseResolution, LedgerHash, NetTime, TxId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A saved round to be replayed instead of built from scratch.
#[derive(Clone, Debug)]
pub struct ReplayPayload {
    /// Must match the previous ledger's id for the replay to be usable.
    pub parent_hash: LedgerHash,
    pub txs: Vec<Transaction>,
    pub close_time: NetTime,
    pub close_time_correct: bool,
    pub close_time_resolution: CloseResolution,
}

/// Produces an immutable child ledger from a parent and an agreed set.
///
/// Implementations decide which transactions actually apply; any that do not
/// are reported through `failed` and excluded from the built ledger.
pub trait LedgerBuilder: Send + Sync {
    fn build(
        &self,
        prev: &Arc<Ledger>,
        txs: &CanonicalTxSet,
        close_time: NetTime,
        close_time_correct: bool,
        resolution: CloseResolution,
        failed: &mut BTreeSet<TxId>,
    ) -> Result<Arc<Ledger>, LedgerError>;

    /// Rebuild a ledger from a saved replay. The caller has already checked
    /// that `replay.parent_hash == prev.id()`.
    fn build_replay(
        &self,
        prev: &Arc<Ledger>,
        replay: &ReplayPayload,
        failed: &mut BTreeSet<TxId>,
    ) -> Result<Arc<Ledger>, LedgerError>;
}

/// The default builder.
///
/// Applies transactions in canonical order; a transaction fails if an
/// earlier transaction in the same set already used its `(account,
/// sequence)` slot. Pseudo-transactions always apply.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardBuilder;

impl StandardBuilder {
    fn apply<'a>(
        txs: impl Iterator<Item = &'a Transaction>,
        failed: &mut BTreeSet<TxId>,
    ) -> TxSetBuilder {
        let mut applied = TxSetBuilder::new();
        let mut used_slots: HashMap<(AccountId, u32), TxId> = HashMap::new();
        for tx in txs {
            if !tx.is_pseudo() {
                let slot = (tx.account, tx.sequence);
                if let Some(winner) = used_slots.get(&slot) {
                    tracing::debug!(tx = %tx.id(), winner = %winner, "transaction lost its sequence slot");
                    failed.insert(tx.id());
                    continue;
                }
                used_slots.insert(slot, tx.id());
            }
            applied.insert(tx);
        }
        applied
    }
}

impl LedgerBuilder for StandardBuilder {
    fn build(
        &self,
        prev: &Arc<Ledger>,
        txs: &CanonicalTxSet,
        close_time: NetTime,
        close_time_correct: bool,
        resolution: CloseResolution,
        failed: &mut BTreeSet<TxId>,
    ) -> Result<Arc<Ledger>, LedgerError> {
        let applied = Self::apply(txs.iter(), failed);
        let set = applied.snapshot();
        Ok(Arc::new(Ledger::build(
            prev,
            set.id(),
            close_time,
            close_time_correct,
            resolution,
        )))
    }

    fn build_replay(
        &self,
        prev: &Arc<Ledger>,
        replay: &ReplayPayload,
        failed: &mut BTreeSet<TxId>,
    ) -> Result<Arc<Ledger>, LedgerError> {
        if replay.parent_hash != prev.id() {
            return Err(LedgerError::ReplayParentMismatch {
                expected: prev.id(),
                got: replay.parent_hash,
            });
        }
        let applied = Self::apply(replay.txs.iter(), failed);
        let set = applied.snapshot();
        Ok(Arc::new(Ledger::build(
            prev,
            set.id(),
            replay.close_time,
            replay.close_time_correct,
            replay.close_time_resolution,
        )))
    }
}
