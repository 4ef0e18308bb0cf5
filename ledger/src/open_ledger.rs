//! The open-ledger mempool and its satellites.
//!
//! The open ledger holds the transactions a node would like to see in the
//! next closed ledger. A round opens by snapshotting it; when the round
//! accepts, the open ledger is rebuilt on top of the new LCL from the
//! retriable set plus the node's local transactions, and the fee queue
//! rebalances.

use crate::ledger::Ledger;
use crate::rules::Rules;
use crate::transaction::{CanonicalTxSet, Transaction};
use crest_types::{LedgerHash, LedgerIndex, TxId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct OpenState {
    parent: Arc<Ledger>,
    /// Rules in force for transactions entering this open ledger.
    rules: Rules,
    txs: BTreeMap<TxId, Transaction>,
}

/// The mempool of open transactions.
pub struct OpenLedger {
    state: Mutex<OpenState>,
}

impl OpenLedger {
    pub fn new(parent: Arc<Ledger>) -> Self {
        Self {
            state: Mutex::new(OpenState {
                rules: parent.rules().clone(),
                parent,
                txs: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OpenState> {
        self.state.lock().expect("open ledger poisoned")
    }

    pub fn insert(&self, tx: Transaction) {
        let mut state = self.lock();
        state.txs.insert(tx.id(), tx);
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.lock().txs.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().txs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().txs.len()
    }

    pub fn parent_id(&self) -> LedgerHash {
        self.lock().parent.id()
    }

    /// The rules in force for this open ledger.
    pub fn rules(&self) -> Rules {
        self.lock().rules.clone()
    }

    /// Snapshot the current open transactions in id order.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.lock().txs.values().cloned().collect()
    }

    /// Rebuild the open ledger on top of a newly accepted ledger.
    ///
    /// The new pool is the retriable set (disputed and unapplied
    /// transactions) plus the node's local transactions; anything the built
    /// ledger already consumed was removed from both by the caller. The fee
    /// queue rebalances once the pool is rebuilt.
    pub fn accept(
        &self,
        rules: &Rules,
        built: Arc<Ledger>,
        local_txs: Vec<Transaction>,
        retriable: &CanonicalTxSet,
        queue: &TxQueue,
    ) {
        let mut state = self.lock();
        state.txs.clear();
        for tx in retriable.iter() {
            state.txs.insert(tx.id(), tx.clone());
        }
        for tx in local_txs {
            state.txs.insert(tx.id(), tx);
        }
        state.parent = built;
        state.rules = rules.clone();
        drop(state);
        queue.rebalance();
    }
}

/// Transactions submitted through this node, retried until they make it
/// into a closed ledger or permanently fail.
pub struct LocalTxs {
    txs: Mutex<BTreeMap<TxId, Transaction>>,
}

impl LocalTxs {
    pub fn new() -> Self {
        Self {
            txs: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn push(&self, tx: Transaction) {
        let mut txs = self.txs.lock().expect("local txs poisoned");
        txs.insert(tx.id(), tx);
    }

    pub fn tx_set(&self) -> Vec<Transaction> {
        self.txs
            .lock()
            .expect("local txs poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Drop local transactions that made it into a closed ledger or
    /// permanently failed.
    pub fn prune(&self, done: &[TxId]) {
        let mut txs = self.txs.lock().expect("local txs poisoned");
        for id in done {
            txs.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.txs.lock().expect("local txs poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LocalTxs {
    fn default() -> Self {
        Self::new()
    }
}

/// The fee queue's consensus-facing surface.
///
/// Fee escalation itself is out of scope; consensus only reports each closed
/// ledger (flagging slow rounds) and triggers a rebalance after the open
/// ledger is rebuilt.
pub struct TxQueue {
    last_closed_seq: AtomicU32,
    slow_rounds: AtomicU64,
    rebalances: AtomicU64,
}

impl TxQueue {
    pub fn new() -> Self {
        Self {
            last_closed_seq: AtomicU32::new(0),
            slow_rounds: AtomicU64::new(0),
            rebalances: AtomicU64::new(0),
        }
    }

    /// Post-close hook: record the built ledger and whether the round ran
    /// long (slow rounds widen fee lanes).
    pub fn process_closed_ledger(&self, seq: LedgerIndex, slow: bool) {
        self.last_closed_seq.store(seq, Ordering::SeqCst);
        if slow {
            self.slow_rounds.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(seq, "slow consensus round reported to fee queue");
        }
    }

    fn rebalance(&self) {
        self.rebalances.fetch_add(1, Ordering::SeqCst);
    }

    pub fn last_closed_seq(&self) -> LedgerIndex {
        self.last_closed_seq.load(Ordering::SeqCst)
    }

    pub fn slow_rounds(&self) -> u64 {
        self.slow_rounds.load(Ordering::SeqCst)
    }

    pub fn rebalances(&self) -> u64 {
        self.rebalances.load(Ordering::SeqCst)
    }
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}
