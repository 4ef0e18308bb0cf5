//! Transactions and the canonical (apply-order) transaction set.

use crate::error::LedgerError;
use crest_crypto::{sha512_half, HashPrefix};
use crest_types::{AccountId, TxId, TxSetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kind of a transaction.
///
/// Pseudo-transactions are injected by the flag-ledger voting modules; they
/// carry no sending account and are never retried through the mempool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// An ordinary account-originated transaction.
    Payment,
    /// Fee-change pseudo-transaction (flag ledgers only).
    SetFee,
    /// Amendment-vote pseudo-transaction (flag ledgers only).
    EnableAmendment,
}

/// A transaction as the consensus layer sees it.
///
/// Transaction *semantics* are out of scope here; consensus only needs the
/// sending account, the per-account sequence (for canonical ordering and
/// apply conflicts), and the opaque payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub account: AccountId,
    pub sequence: u32,
    pub kind: TxKind,
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(account: AccountId, sequence: u32, payload: Vec<u8>) -> Self {
        Self {
            account,
            sequence,
            kind: TxKind::Payment,
            payload,
        }
    }

    /// Construct a pseudo-transaction for a flag-ledger vote.
    pub fn pseudo(kind: TxKind, payload: Vec<u8>) -> Self {
        Self {
            account: AccountId::ZERO,
            sequence: 0,
            kind,
            payload,
        }
    }

    pub fn is_pseudo(&self) -> bool {
        self.kind != TxKind::Payment
    }

    /// The transaction id: SHA-512-half of the canonical serialization.
    pub fn id(&self) -> TxId {
        TxId::new(sha512_half(HashPrefix::Transaction, &self.to_bytes()))
    }

    /// Canonical serialization (the bytes stored in a transaction set).
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transaction serialization cannot fail")
    }

    /// Parse a transaction-set leaf back into a transaction.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::MalformedTransaction(e.to_string()))
    }
}

/// Key for canonical apply ordering: accounts are shuffled by a per-round
/// salt so no account can reliably buy a position at the front of every
/// ledger, then ordered by sequence within an account.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalKey {
    salted_account: [u8; 32],
    sequence: u32,
    id: TxId,
}

/// The agreed transactions in deterministic apply order.
///
/// Keyed by the consensus set's hash: every node derives the same
/// account-ordering salt and therefore the same apply order.
pub struct CanonicalTxSet {
    salt: TxSetId,
    txs: BTreeMap<CanonicalKey, Transaction>,
}

impl CanonicalTxSet {
    pub fn new(salt: TxSetId) -> Self {
        Self {
            salt,
            txs: BTreeMap::new(),
        }
    }

    /// The ordering salt (the consensus set hash this set was built from).
    pub fn key(&self) -> TxSetId {
        self.salt
    }

    fn salted(&self, account: &AccountId) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, b) in out.iter_mut().enumerate() {
            *b = account.as_bytes()[i] ^ self.salt.as_bytes()[i];
        }
        out
    }

    pub fn insert(&mut self, tx: Transaction) {
        let key = CanonicalKey {
            salted_account: self.salted(&tx.account),
            sequence: tx.sequence,
            id: tx.id(),
        };
        self.txs.insert(key, tx);
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Transactions in canonical apply order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.txs.values()
    }

    /// All transaction ids currently in the set.
    pub fn ids(&self) -> Vec<TxId> {
        self.txs.keys().map(|k| k.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> AccountId {
        AccountId::new([byte; 32])
    }

    fn tx(acct: u8, seq: u32) -> Transaction {
        Transaction::new(account(acct), seq, vec![acct, seq as u8])
    }

    #[test]
    fn tx_roundtrip() {
        let t = tx(1, 7);
        let parsed = Transaction::from_bytes(&t.to_bytes()).unwrap();
        assert_eq!(parsed, t);
        assert_eq!(parsed.id(), t.id());
    }

    #[test]
    fn malformed_bytes_rejected() {
        assert!(Transaction::from_bytes(&[0xFF, 0x01]).is_err());
    }

    #[test]
    fn pseudo_has_no_account() {
        let p = Transaction::pseudo(TxKind::SetFee, vec![1, 2]);
        assert!(p.is_pseudo());
        assert!(p.account.is_zero());
        assert!(!tx(1, 1).is_pseudo());
    }

    #[test]
    fn canonical_order_respects_sequence_within_account() {
        let mut set = CanonicalTxSet::new(TxSetId::new([9u8; 32]));
        set.insert(tx(1, 2));
        set.insert(tx(1, 1));
        let seqs: Vec<u32> = set.iter().map(|t| t.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn canonical_order_depends_on_salt() {
        let a = tx(0x10, 1);
        let b = tx(0x20, 1);

        let first_account_under = |salt_byte: u8| {
            let mut set = CanonicalTxSet::new(TxSetId::new([salt_byte; 32]));
            set.insert(a.clone());
            set.insert(b.clone());
            let account = set.iter().next().unwrap().account;
            account
        };

        // A zero salt preserves raw account order; a salt flipping the
        // distinguishing bit reverses it.
        assert_eq!(first_account_under(0x00), a.account);
        assert_eq!(first_account_under(0x30), b.account);
    }

    #[test]
    fn ids_lists_every_inserted_tx() {
        let mut set = CanonicalTxSet::new(TxSetId::ZERO);
        set.insert(tx(1, 1));
        set.insert(tx(2, 1));
        assert_eq!(set.len(), 2);
        let ids = set.ids();
        assert!(ids.contains(&tx(1, 1).id()));
        assert!(ids.contains(&tx(2, 1).id()));
    }
}
