//! Signed validations: a validator's statement that a closed ledger is
//! accepted.

use crest_crypto::{sha512_half, sign_digest, verify_digest, HashPrefix};
use crest_types::{
    AmendmentId, KeyPair, LedgerHash, LedgerIndex, NetTime, NodeId, PublicKey, Signature, TxSetId,
};
use serde::{Deserialize, Serialize};

/// The signed fields of a validation, in canonical order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct ValidationBody {
    ledger_hash: LedgerHash,
    ledger_seq: LedgerIndex,
    consensus_hash: TxSetId,
    signing_time: NetTime,
    public_key: PublicKey,
    node_id: NodeId,
    /// Full iff the validator proposed in the round it validated.
    full: bool,
    /// Advertised load fee, present only under fee escalation.
    load_fee: Option<u32>,
    /// Amendment votes, present only on flag ledgers.
    amendments: Vec<AmendmentId>,
}

/// A validation as stored and broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    body: ValidationBody,
    signature: Signature,
}

impl Validation {
    /// Build and sign a validation.
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        ledger_hash: LedgerHash,
        ledger_seq: LedgerIndex,
        consensus_hash: TxSetId,
        signing_time: NetTime,
        full: bool,
        load_fee: Option<u32>,
        amendments: Vec<AmendmentId>,
        node_id: NodeId,
        keys: &KeyPair,
    ) -> Self {
        let body = ValidationBody {
            ledger_hash,
            ledger_seq,
            consensus_hash,
            signing_time,
            public_key: keys.public,
            node_id,
            full,
            load_fee,
            amendments,
        };
        let signature = sign_digest(&body.digest(), &keys.private);
        Self { body, signature }
    }

    pub fn ledger_hash(&self) -> LedgerHash {
        self.body.ledger_hash
    }

    pub fn ledger_seq(&self) -> LedgerIndex {
        self.body.ledger_seq
    }

    pub fn consensus_hash(&self) -> TxSetId {
        self.body.consensus_hash
    }

    pub fn signing_time(&self) -> NetTime {
        self.body.signing_time
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.body.public_key
    }

    pub fn node_id(&self) -> NodeId {
        self.body.node_id
    }

    pub fn is_full(&self) -> bool {
        self.body.full
    }

    pub fn load_fee(&self) -> Option<u32> {
        self.body.load_fee
    }

    pub fn amendments(&self) -> &[AmendmentId] {
        &self.body.amendments
    }

    /// Verify the signature over the canonical digest.
    pub fn verify(&self) -> bool {
        verify_digest(&self.body.digest(), &self.signature, &self.body.public_key)
    }

    /// The canonical serialization carried opaquely on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("validation serialization cannot fail")
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bincode::deserialize(bytes).ok()
    }

    /// Fingerprint for the suppression set.
    pub fn suppression_id(&self) -> [u8; 32] {
        sha512_half(HashPrefix::Validation, &self.to_bytes())
    }
}

impl ValidationBody {
    fn digest(&self) -> [u8; 32] {
        let bytes = bincode::serialize(self).expect("validation serialization cannot fail");
        sha512_half(HashPrefix::Validation, &bytes)
    }
}
