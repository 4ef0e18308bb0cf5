//! Content-addressed candidate transaction sets.
//!
//! A round opens by snapshotting the open ledger into a [`TxSetBuilder`],
//! which stays mutable while flag-ledger votes insert pseudo-transactions.
//! [`TxSetBuilder::snapshot`] freezes it into an immutable [`TxSet`] whose
//! identity is the Merkle hash of its leaves. Two sets are equal iff their
//! identities are equal.

use crate::error::LedgerError;
use crate::transaction::Transaction;
use crest_crypto::{sha512_half_multi, HashPrefix};
use crest_types::{TxId, TxSetId};
use std::collections::BTreeMap;

fn leaf_hash(id: &TxId, data: &[u8]) -> [u8; 32] {
    sha512_half_multi(HashPrefix::TxNode, &[id.as_bytes(), data])
}

/// Merkle root over the leaf hashes in key order. An odd node at the end of
/// a level is promoted unchanged; the empty set has a fixed sentinel root.
fn merkle_root(leaves: &BTreeMap<TxId, Vec<u8>>) -> TxSetId {
    if leaves.is_empty() {
        return TxSetId::new(sha512_half_multi(HashPrefix::InnerNode, &[]));
    }
    let mut level: Vec<[u8; 32]> = leaves.iter().map(|(id, data)| leaf_hash(id, data)).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        for pair in level.chunks(2) {
            if pair.len() == 2 {
                next.push(sha512_half_multi(
                    HashPrefix::InnerNode,
                    &[&pair[0], &pair[1]],
                ));
            } else {
                next.push(pair[0]);
            }
        }
        level = next;
    }
    TxSetId::new(level[0])
}

/// The mutable precursor of a [`TxSet`].
#[derive(Clone, Debug, Default)]
pub struct TxSetBuilder {
    entries: BTreeMap<TxId, Vec<u8>>,
}

impl TxSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a serialized transaction under its id.
    pub fn insert_raw(&mut self, id: TxId, data: Vec<u8>) {
        self.entries.insert(id, data);
    }

    /// Serialize and insert a transaction.
    pub fn insert(&mut self, tx: &Transaction) {
        self.entries.insert(tx.id(), tx.to_bytes());
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the identity: no further mutation is possible.
    pub fn snapshot(self) -> TxSet {
        let id = merkle_root(&self.entries);
        TxSet {
            id,
            entries: self.entries,
        }
    }
}

/// An immutable, content-addressed transaction set.
#[derive(Clone, Debug)]
pub struct TxSet {
    id: TxSetId,
    entries: BTreeMap<TxId, Vec<u8>>,
}

impl TxSet {
    /// The set identity: Merkle hash of the leaves.
    pub fn id(&self) -> TxSetId {
        self.id
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &TxId) -> Option<&[u8]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate leaves in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&TxId, &[u8])> {
        self.entries.iter().map(|(id, data)| (id, data.as_slice()))
    }

    /// All leaf ids in id order.
    pub fn ids(&self) -> Vec<TxId> {
        self.entries.keys().copied().collect()
    }

    /// Verify internal consistency: the stored identity must match the
    /// recomputed Merkle root. A mismatch means a node of the backing tree
    /// is missing or corrupt.
    pub fn verify(&self) -> Result<(), LedgerError> {
        if merkle_root(&self.entries) == self.id {
            Ok(())
        } else {
            Err(LedgerError::MissingNode(self.id))
        }
    }
}

impl PartialEq for TxSet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TxSet {}
