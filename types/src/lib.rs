//! Fundamental types for the CREST protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: ledger and transaction hashes, validator identities, signing
//! keys, network time, close-time resolutions, and consensus parameters.

pub mod hash;
pub mod keys;
pub mod params;
pub mod time;

pub use hash::{AccountId, AmendmentId, LedgerHash, TxId, TxSetId};
pub use keys::{KeyPair, NodeId, PrivateKey, PublicKey, Signature};
pub use params::ConsensusParams;
pub use time::{CloseResolution, NetTime};

/// A ledger sequence number. Sequence 1 is the genesis ledger.
pub type LedgerIndex = u32;
