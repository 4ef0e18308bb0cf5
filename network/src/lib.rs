//! Overlay messaging for the CREST consensus layer.
//!
//! - [`wire`] — the peer-to-peer message formats consensus emits and
//!   consumes: proposals, validations, transactions, status changes, and
//!   tx-set exchange.
//! - [`overlay`] — the fire-and-forget broadcast surface, backed by an
//!   outbound channel in production and a recording double in tests.
//! - [`suppression`] — the hash router: a bounded, time-windowed set of
//!   message fingerprints that deduplicates relays.

pub mod error;
pub mod overlay;
pub mod suppression;
pub mod wire;

pub use error::NetworkError;
pub use overlay::{ChannelOverlay, NullOverlay, Overlay};
pub use suppression::HashRouter;
pub use wire::{
    decode, encode, NodeEvent, ProposeSetMsg, StatusChangeMsg, TransactionMsg, TxSetDataMsg,
    TxSetRequestMsg, TxStatus, ValidationMsg, WireMessage,
};
