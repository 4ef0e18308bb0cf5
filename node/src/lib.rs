//! The CREST node: wires the consensus adaptor to its collaborators.
//!
//! This crate assembles a running node out of the lower layers — ledger
//! master, open ledger, validation and tx-set stores, overlay, clocks —
//! plus the operational surface around them: configuration, logging,
//! stats, the network-operations module, and the prune-advisory parser.

pub mod config;
pub mod error;
pub mod logging;
pub mod network_ops;
pub mod node;
pub mod prune;
pub mod stats;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use network_ops::{NetworkOps, OperatingMode};
pub use node::ConsensusNode;
pub use prune::PruneTarget;
pub use stats::{ConsensusStats, Counter};
