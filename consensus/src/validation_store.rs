//! The validation store: signed validations by trusted validators.
//!
//! Answers the adaptor's questions about the validated frontier: how many
//! trusted validators have accepted ledger `H`, which branch the network
//! prefers, and who is lagging. Enforces the per-validator invariants: at
//! most one validation per `(node, ledger-sequence)` and strictly
//! increasing signing times.

use crate::trusted_validators::TrustedValidators;
use crate::validation::Validation;
use crest_ledger::Ledger;
use crest_types::{LedgerHash, LedgerIndex, NetTime, NodeId, PublicKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Outcome of offering a validation to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValStatus {
    /// Accepted and now the node's latest.
    Current,
    /// Signature did not verify.
    BadSignature,
    /// Signing time not strictly after the node's previous validation.
    Stale,
    /// The node already validated a different ledger at this sequence.
    Conflicting,
}

struct StoreState {
    by_ledger: HashMap<LedgerHash, HashMap<NodeId, Arc<Validation>>>,
    latest: HashMap<NodeId, Arc<Validation>>,
    by_node_seq: HashMap<(NodeId, LedgerIndex), LedgerHash>,
    /// Highest sequence validated by this node locally.
    last_local_seq: LedgerIndex,
}

pub struct ValidationStore {
    trusted: Arc<TrustedValidators>,
    state: Mutex<StoreState>,
}

impl ValidationStore {
    pub fn new(trusted: Arc<TrustedValidators>) -> Self {
        Self {
            trusted,
            state: Mutex::new(StoreState {
                by_ledger: HashMap::new(),
                latest: HashMap::new(),
                by_node_seq: HashMap::new(),
                last_local_seq: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("validation store poisoned")
    }

    /// Offer a peer validation to the store.
    pub fn add(&self, validation: Validation) -> ValStatus {
        if !validation.verify() {
            return ValStatus::BadSignature;
        }
        self.insert(validation)
    }

    /// Record this node's own validation (already signed locally).
    pub fn add_local(&self, validation: Validation) -> ValStatus {
        let seq = validation.ledger_seq();
        let status = self.insert(validation);
        if status == ValStatus::Current {
            let mut state = self.lock();
            state.last_local_seq = state.last_local_seq.max(seq);
        }
        status
    }

    fn insert(&self, validation: Validation) -> ValStatus {
        let node = validation.node_id();
        let seq = validation.ledger_seq();
        let hash = validation.ledger_hash();
        let mut state = self.lock();

        if let Some(prev) = state.latest.get(&node) {
            if validation.signing_time() <= prev.signing_time() {
                return ValStatus::Stale;
            }
        }
        if let Some(existing) = state.by_node_seq.get(&(node, seq)) {
            if *existing != hash {
                tracing::warn!(%node, seq, "validator emitted conflicting validations");
                return ValStatus::Conflicting;
            }
            return ValStatus::Stale;
        }

        let validation = Arc::new(validation);
        state.by_node_seq.insert((node, seq), hash);
        state
            .by_ledger
            .entry(hash)
            .or_default()
            .insert(node, Arc::clone(&validation));
        state.latest.insert(node, validation);
        ValStatus::Current
    }

    /// How many trusted validators have accepted ledger `hash`.
    pub fn num_trusted_for(&self, hash: &LedgerHash) -> usize {
        let state = self.lock();
        state.by_ledger.get(hash).map_or(0, |per_node| {
            per_node
                .keys()
                .filter(|node| self.trusted.is_trusted(node))
                .count()
        })
    }

    /// All trusted validations for ledger `hash`.
    pub fn trusted_for(&self, hash: &LedgerHash) -> Vec<Arc<Validation>> {
        let state = self.lock();
        state.by_ledger.get(hash).map_or_else(Vec::new, |per_node| {
            per_node
                .iter()
                .filter(|(node, _)| self.trusted.is_trusted(node))
                .map(|(_, v)| Arc::clone(v))
                .collect()
        })
    }

    /// Count of trusted validators whose latest validated ledger sits
    /// strictly after `ledger` on its branch. Branch membership is
    /// approximated by sequence: a later validated sequence counts.
    pub fn nodes_after(&self, ledger: &Ledger, _hash: LedgerHash) -> usize {
        let state = self.lock();
        state
            .latest
            .iter()
            .filter(|(node, v)| {
                self.trusted.is_trusted(node) && v.ledger_seq() > ledger.seq()
            })
            .count()
    }

    /// The network-preferred ledger given our local view.
    ///
    /// Tallies trusted validators' latest validations at or above
    /// `min_valid_seq` by ledger hash and picks the best-supported branch
    /// (ties broken by sequence, then hash). Our local ledger wins unless a
    /// different branch has strictly more support.
    pub fn preferred(&self, local: &Ledger, min_valid_seq: LedgerIndex) -> LedgerHash {
        let state = self.lock();
        let mut support: HashMap<LedgerHash, (usize, LedgerIndex)> = HashMap::new();
        for (node, v) in &state.latest {
            if !self.trusted.is_trusted(node) || v.ledger_seq() < min_valid_seq {
                continue;
            }
            let entry = support.entry(v.ledger_hash()).or_insert((0, v.ledger_seq()));
            entry.0 += 1;
        }
        let local_support = support.get(&local.id()).map_or(0, |(n, _)| *n);
        let best = support
            .iter()
            .map(|(hash, (n, seq))| (*n, *seq, *hash))
            .max_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        match best {
            Some((n, _, hash)) if n > local_support => hash,
            _ => local.id(),
        }
    }

    /// Whether this node may emit a validation for `seq`: at most one
    /// validation per sequence, never regressing.
    pub fn can_validate_seq(&self, seq: LedgerIndex) -> bool {
        seq > self.lock().last_local_seq
    }

    /// Remove from `trusted_keys` every validator whose latest validation
    /// has reached `seq`; returns how many laggards remain.
    pub fn laggards(&self, seq: LedgerIndex, trusted_keys: &mut HashSet<PublicKey>) -> usize {
        let state = self.lock();
        for v in state.latest.values() {
            if v.ledger_seq() >= seq {
                trusted_keys.remove(v.public_key());
            }
        }
        trusted_keys.len()
    }

    /// Drop validations for ledgers below `seq`.
    pub fn prune_below(&self, seq: LedgerIndex) {
        let mut state = self.lock();
        state
            .by_ledger
            .retain(|_, per_node| per_node.values().next().is_some_and(|v| v.ledger_seq() >= seq));
        state.by_node_seq.retain(|(_, s), _| *s >= seq);
    }

    /// Latest validation signing time recorded for `node`, if any.
    pub fn last_signing_time(&self, node: &NodeId) -> Option<NetTime> {
        self.lock().latest.get(node).map(|v| v.signing_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crest_crypto::{keypair_from_seed, node_id_from_public};
    use crest_ledger::Rules;
    use crest_types::{KeyPair, TxSetId};

    struct Validator {
        keys: KeyPair,
        node: NodeId,
    }

    fn validator(seed: u8) -> Validator {
        let keys = keypair_from_seed(&[seed; 32]);
        let node = node_id_from_public(&keys.public);
        Validator { keys, node }
    }

    fn store_with(validators: &[&Validator]) -> ValidationStore {
        let trusted = Arc::new(TrustedValidators::new());
        trusted.set_list(
            validators.iter().map(|v| (v.node, v.keys.public)),
            Some(NetTime::from_secs(u64::MAX / 2)),
        );
        ValidationStore::new(trusted)
    }

    fn val(v: &Validator, hash: u8, seq: LedgerIndex, time: u64) -> Validation {
        Validation::sign(
            LedgerHash::new([hash; 32]),
            seq,
            TxSetId::ZERO,
            NetTime::from_secs(time),
            true,
            None,
            vec![],
            v.node,
            &v.keys,
        )
    }

    fn ledger_at(seq: LedgerIndex) -> Ledger {
        // Build a chain up to `seq` so the ledger has a real header.
        let mut ledger = Ledger::genesis(NetTime::from_secs(100), Rules::default());
        for i in 1..seq {
            ledger = Ledger::build(
                &ledger,
                TxSetId::ZERO,
                NetTime::from_secs(100 + u64::from(i) * 10),
                true,
                crest_types::CloseResolution::INITIAL,
            );
        }
        ledger
    }

    #[test]
    fn accepts_first_validation() {
        let a = validator(1);
        let store = store_with(&[&a]);
        assert_eq!(store.add(val(&a, 9, 5, 1_000)), ValStatus::Current);
        assert_eq!(store.num_trusted_for(&LedgerHash::new([9; 32])), 1);
    }

    #[test]
    fn rejects_non_increasing_signing_time() {
        let a = validator(1);
        let store = store_with(&[&a]);
        store.add(val(&a, 9, 5, 1_000));
        assert_eq!(store.add(val(&a, 8, 6, 1_000)), ValStatus::Stale);
        assert_eq!(store.add(val(&a, 8, 6, 999)), ValStatus::Stale);
        assert_eq!(store.add(val(&a, 8, 6, 1_001)), ValStatus::Current);
    }

    #[test]
    fn one_validation_per_node_and_seq() {
        let a = validator(1);
        let store = store_with(&[&a]);
        store.add(val(&a, 9, 5, 1_000));
        // Different ledger at the same sequence: conflicting.
        assert_eq!(store.add(val(&a, 8, 5, 1_001)), ValStatus::Conflicting);
    }

    #[test]
    fn untrusted_validators_do_not_count() {
        let a = validator(1);
        let stranger = validator(2);
        let store = store_with(&[&a]);
        store.add(val(&a, 9, 5, 1_000));
        store.add(val(&stranger, 9, 5, 1_000));
        assert_eq!(store.num_trusted_for(&LedgerHash::new([9; 32])), 1);
        assert_eq!(store.trusted_for(&LedgerHash::new([9; 32])).len(), 1);
    }

    #[test]
    fn bad_signature_rejected() {
        let a = validator(1);
        let b = validator(2);
        let store = store_with(&[&a]);
        // Signed by b but claiming a's node id.
        let forged = Validation::sign(
            LedgerHash::new([9; 32]),
            5,
            TxSetId::ZERO,
            NetTime::from_secs(1_000),
            true,
            None,
            vec![],
            a.node,
            &b.keys,
        );
        // Signature is internally consistent (b signed it), so it stores
        // under b's key; a forged signature blob is what must fail.
        assert!(forged.verify());
        let mut bytes = forged.to_bytes();
        let len = bytes.len();
        bytes[len - 1] ^= 0xFF;
        if let Some(bad) = Validation::from_bytes(&bytes) {
            assert_eq!(store.add(bad), ValStatus::BadSignature);
        }
    }

    #[test]
    fn nodes_after_counts_later_trusted_validations() {
        let a = validator(1);
        let b = validator(2);
        let c = validator(3);
        let store = store_with(&[&a, &b, &c]);
        store.add(val(&a, 9, 10, 1_000));
        store.add(val(&b, 8, 12, 1_000));
        store.add(val(&c, 7, 13, 1_000));

        let parent = ledger_at(11);
        assert_eq!(store.nodes_after(&parent, parent.id()), 2);
    }

    #[test]
    fn preferred_follows_majority_branch() {
        let a = validator(1);
        let b = validator(2);
        let c = validator(3);
        let store = store_with(&[&a, &b, &c]);
        let local = ledger_at(5);

        // Nobody has validated: we prefer our own ledger.
        assert_eq!(store.preferred(&local, 0), local.id());

        // Two of three trusted validators sit on a different branch.
        store.add(val(&a, 9, 5, 1_000));
        store.add(val(&b, 9, 5, 1_001));
        store.add(val(&c, 7, 5, 1_002));
        assert_eq!(store.preferred(&local, 0), LedgerHash::new([9; 32]));
    }

    #[test]
    fn single_trusted_vote_outweighs_unvalidated_local() {
        let a = validator(1);
        let store = store_with(&[&a]);
        let local = ledger_at(5);
        store.add(val(&a, 9, 5, 1_000));
        assert_eq!(store.preferred(&local, 0), LedgerHash::new([9; 32]));
    }

    #[test]
    fn can_validate_seq_never_regresses() {
        let a = validator(1);
        let store = store_with(&[&a]);
        assert!(store.can_validate_seq(5));
        store.add_local(val(&a, 9, 5, 1_000));
        assert!(!store.can_validate_seq(5));
        assert!(!store.can_validate_seq(4));
        assert!(store.can_validate_seq(6));
    }

    #[test]
    fn laggards_removes_caught_up_keys() {
        let a = validator(1);
        let b = validator(2);
        let store = store_with(&[&a, &b]);
        store.add(val(&a, 9, 10, 1_000));
        store.add(val(&b, 8, 4, 1_000));

        let mut keys: HashSet<PublicKey> = [a.keys.public, b.keys.public].into_iter().collect();
        let remaining = store.laggards(8, &mut keys);
        assert_eq!(remaining, 1);
        assert!(keys.contains(&b.keys.public));
    }

    #[test]
    fn prune_below_drops_old_sequences() {
        let a = validator(1);
        let store = store_with(&[&a]);
        store.add(val(&a, 9, 5, 1_000));
        store.add(val(&a, 8, 6, 1_001));
        store.prune_below(6);
        assert_eq!(store.num_trusted_for(&LedgerHash::new([9; 32])), 0);
        assert_eq!(store.num_trusted_for(&LedgerHash::new([8; 32])), 1);
    }
}
