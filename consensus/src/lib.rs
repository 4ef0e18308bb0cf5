//! Consensus for the CREST ledger: the round adaptor and its machinery.
//!
//! Every few seconds the network's validators agree on the next ledger's
//! transaction set and close time. A generic round engine drives the
//! protocol phases; the **round adaptor** connects it to the concrete
//! ledger world: transaction sets, signed validations, overlay messages,
//! the open-ledger mempool, and the local ledger store.
//!
//! ## Module overview
//!
//! - [`proposal`] — signed peer positions (proposals), bow-outs, digests.
//! - [`validation`] — signed validations and their canonical serialization.
//! - [`validation_store`] — trusted validations by ledger, branch support.
//! - [`censorship`] — tracks proposed-but-never-included transactions.
//! - [`tx_set_store`] — content-addressed tx-set exchange with peers.
//! - [`trusted_validators`] — the trusted validator list and quorum.
//! - [`flag_voting`] — fee/amendment voting seams for flag ledgers.
//! - [`modes`] — proposing / observing / wrong-ledger / switched.
//! - [`engine`] — the generic round engine and the adaptor capability trait.
//! - [`adaptor`] — the round adaptor and its locked public surface.
//! - [`workers`] — the background job queue for accept/advance offload.
//! - [`error`] — consensus error types.

pub mod adaptor;
pub mod censorship;
pub mod engine;
pub mod error;
pub mod flag_voting;
pub mod modes;
pub mod proposal;
pub mod trusted_validators;
pub mod tx_set_store;
pub mod validation;
pub mod validation_store;
pub mod workers;

pub use adaptor::{LedgerConsensus, NetOps, RoundAdaptor, RoundAdaptorBuilder};
pub use censorship::CensorshipDetector;
pub use engine::{
    Adaptor, CloseTimes, Consensus, ConsensusResult, ConsensusState, DisputedTx, RawTx,
};
pub use error::ConsensusError;
pub use flag_voting::{AmendmentVote, DefaultAmendmentVote, DefaultFeeVote, FeeVote};
pub use modes::ConsensusMode;
pub use proposal::{PeerProposal, Proposal};
pub use trusted_validators::TrustedValidators;
pub use tx_set_store::TxSetStore;
pub use validation::Validation;
pub use validation_store::{ValStatus, ValidationStore};
pub use workers::{JobKind, JobQueue};
