//! Peer positions (proposals) for the round in progress.
//!
//! A proposal names the transaction set its proposer currently wants in the
//! next ledger, plus the close time it favors. The propose sequence starts
//! at [`Proposal::SEQ_JOIN`] when a node (re-)enters a round and increases
//! every time it changes position; [`Proposal::SEQ_BOW_OUT`] withdraws from
//! the round.

use crest_crypto::{sha512_half_multi, sign_digest, verify_digest, HashPrefix};
use crest_types::{KeyPair, LedgerHash, NetTime, NodeId, PublicKey, Signature, TxSetId};
use crest_network::ProposeSetMsg;
use serde::{Deserialize, Serialize};

/// An unsigned position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// The ledger this position builds on.
    pub prev_ledger: LedgerHash,
    /// Starts at [`Self::SEQ_JOIN`]; nondecreasing per (node, round).
    pub propose_seq: u32,
    /// The proposed transaction-set hash.
    pub position: TxSetId,
    /// The proposed close time (seconds since network epoch).
    pub close_time: NetTime,
    /// The proposing node.
    pub node_id: NodeId,
}

impl Proposal {
    /// The sequence a node uses when first joining a round.
    pub const SEQ_JOIN: u32 = 0;
    /// The sentinel sequence announcing withdrawal from the round.
    pub const SEQ_BOW_OUT: u32 = u32::MAX;

    pub fn new(
        prev_ledger: LedgerHash,
        propose_seq: u32,
        position: TxSetId,
        close_time: NetTime,
        node_id: NodeId,
    ) -> Self {
        Self {
            prev_ledger,
            propose_seq,
            position,
            close_time,
            node_id,
        }
    }

    /// Advance to a new position (next propose sequence).
    pub fn change_position(&mut self, position: TxSetId, close_time: NetTime) {
        self.position = position;
        self.close_time = close_time;
        if self.propose_seq != Self::SEQ_BOW_OUT {
            self.propose_seq += 1;
        }
    }

    /// Withdraw from the round.
    pub fn bow_out(&mut self) {
        self.propose_seq = Self::SEQ_BOW_OUT;
    }

    pub fn is_bow_out(&self) -> bool {
        self.propose_seq == Self::SEQ_BOW_OUT
    }

    /// The canonical signing digest:
    /// `sha512_half(PROPOSAL ∥ propose_seq ∥ close_time ∥ prev_ledger ∥ position)`.
    pub fn signing_digest(&self) -> [u8; 32] {
        sha512_half_multi(
            HashPrefix::Proposal,
            &[
                &self.propose_seq.to_be_bytes(),
                &(self.close_time.as_secs() as u32).to_be_bytes(),
                self.prev_ledger.as_bytes(),
                self.position.as_bytes(),
            ],
        )
    }

    /// Sign this position, producing a broadcastable peer proposal.
    pub fn sign(self, keys: &KeyPair) -> PeerProposal {
        let signature = sign_digest(&self.signing_digest(), &keys.private);
        PeerProposal {
            proposal: self,
            public_key: keys.public,
            signature,
        }
    }
}

/// A signed position as received from (or sent to) the overlay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerProposal {
    pub proposal: Proposal,
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl PeerProposal {
    /// Verify the signature over the canonical digest.
    pub fn verify(&self) -> bool {
        verify_digest(
            &self.proposal.signing_digest(),
            &self.signature,
            &self.public_key,
        )
    }

    /// The suppression fingerprint: relays of the same signed position
    /// deduplicate on this id.
    pub fn suppression_id(&self) -> [u8; 32] {
        sha512_half_multi(
            HashPrefix::Proposal,
            &[
                self.proposal.position.as_bytes(),
                self.proposal.prev_ledger.as_bytes(),
                &self.proposal.propose_seq.to_be_bytes(),
                &(self.proposal.close_time.as_secs() as u32).to_be_bytes(),
                self.public_key.as_bytes(),
                self.signature.as_bytes(),
            ],
        )
    }

    /// Encode for the wire.
    pub fn to_wire(&self) -> ProposeSetMsg {
        ProposeSetMsg {
            propose_seq: self.proposal.propose_seq,
            close_time: self.proposal.close_time.as_secs() as u32,
            current_tx_hash: *self.proposal.position.as_bytes(),
            previous_ledger: *self.proposal.prev_ledger.as_bytes(),
            node_pub_key: self.public_key.as_bytes().to_vec(),
            signature: self.signature.as_bytes().to_vec(),
        }
    }

    /// Parse from the wire. Returns `None` for structurally invalid key or
    /// signature lengths; signature *verification* is a separate step.
    pub fn from_wire(msg: &ProposeSetMsg) -> Option<Self> {
        let key_bytes: [u8; 32] = msg.node_pub_key.as_slice().try_into().ok()?;
        let sig_bytes: [u8; 64] = msg.signature.as_slice().try_into().ok()?;
        let public_key = PublicKey(key_bytes);
        Some(Self {
            proposal: Proposal {
                prev_ledger: LedgerHash::new(msg.previous_ledger),
                propose_seq: msg.propose_seq,
                position: TxSetId::new(msg.current_tx_hash),
                close_time: NetTime::from_secs(u64::from(msg.close_time)),
                node_id: crest_crypto::node_id_from_public(&public_key),
            },
            public_key,
            signature: Signature(sig_bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crest_crypto::{keypair_from_seed, node_id_from_public};

    fn keys() -> KeyPair {
        keypair_from_seed(&[21u8; 32])
    }

    fn sample(keys: &KeyPair) -> Proposal {
        Proposal::new(
            LedgerHash::new([1u8; 32]),
            Proposal::SEQ_JOIN,
            TxSetId::new([2u8; 32]),
            NetTime::from_secs(1_000),
            node_id_from_public(&keys.public),
        )
    }

    #[test]
    fn sign_and_verify() {
        let keys = keys();
        let signed = sample(&keys).sign(&keys);
        assert!(signed.verify());
    }

    #[test]
    fn tampered_position_fails_verification() {
        let keys = keys();
        let mut signed = sample(&keys).sign(&keys);
        signed.proposal.position = TxSetId::new([9u8; 32]);
        assert!(!signed.verify());
    }

    #[test]
    fn wire_roundtrip_preserves_everything() {
        let keys = keys();
        let signed = sample(&keys).sign(&keys);
        let parsed = PeerProposal::from_wire(&signed.to_wire()).unwrap();
        assert_eq!(parsed, signed);
        assert!(parsed.verify());
    }

    #[test]
    fn from_wire_rejects_bad_key_length() {
        let keys = keys();
        let mut msg = sample(&keys).sign(&keys).to_wire();
        msg.node_pub_key.truncate(16);
        assert!(PeerProposal::from_wire(&msg).is_none());
    }

    #[test]
    fn change_position_bumps_sequence() {
        let keys = keys();
        let mut p = sample(&keys);
        assert_eq!(p.propose_seq, Proposal::SEQ_JOIN);
        p.change_position(TxSetId::new([5u8; 32]), NetTime::from_secs(1_010));
        assert_eq!(p.propose_seq, 1);
    }

    #[test]
    fn bow_out_is_terminal_sequence() {
        let keys = keys();
        let mut p = sample(&keys);
        p.bow_out();
        assert!(p.is_bow_out());
        // A bowed-out position no longer advances.
        p.change_position(TxSetId::new([5u8; 32]), NetTime::from_secs(1_010));
        assert!(p.is_bow_out());
    }

    #[test]
    fn suppression_id_binds_the_signature() {
        let keys = keys();
        let a = sample(&keys).sign(&keys);
        let mut b = a.clone();
        b.signature = Signature([0u8; 64]);
        assert_ne!(a.suppression_id(), b.suppression_id());
    }

    #[test]
    fn digest_covers_every_field() {
        let keys = keys();
        let base = sample(&keys);

        let mut changed = base.clone();
        changed.propose_seq = 5;
        assert_ne!(base.signing_digest(), changed.signing_digest());

        let mut changed = base.clone();
        changed.close_time = NetTime::from_secs(2_000);
        assert_ne!(base.signing_digest(), changed.signing_digest());

        let mut changed = base.clone();
        changed.prev_ledger = LedgerHash::new([7u8; 32]);
        assert_ne!(base.signing_digest(), changed.signing_digest());

        let mut changed = base.clone();
        changed.position = TxSetId::new([7u8; 32]);
        assert_ne!(base.signing_digest(), changed.signing_digest());
    }
}
