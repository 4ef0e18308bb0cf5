//! Ledgers and transaction sets for the CREST protocol.
//!
//! - [`Ledger`] — an immutable closed ledger: header fields plus the enabled
//!   amendment rules, content-addressed by a SHA-512-half header hash.
//! - [`TxSet`] / [`TxSetBuilder`] — the content-addressed candidate
//!   transaction set a round converges on. Mutable until snapshotted.
//! - [`LedgerBuilder`] — given a parent and an agreed set, produces the next
//!   immutable ledger (or rebuilds one from a replay payload).
//! - [`LedgerMaster`] — the local ledger store and validated line: the last
//!   closed ledger, compatibility checks, held transactions, replay slot.
//! - [`OpenLedger`] — the mempool of open transactions rebuilt on top of
//!   each newly accepted ledger.

pub mod builder;
pub mod error;
pub mod fee_track;
pub mod ledger;
pub mod master;
pub mod open_ledger;
pub mod rules;
pub mod transaction;
pub mod tx_set;

pub use builder::{LedgerBuilder, ReplayPayload, StandardBuilder};
pub use error::LedgerError;
pub use fee_track::LoadFeeTrack;
pub use ledger::Ledger;
pub use master::LedgerMaster;
pub use open_ledger::{LocalTxs, OpenLedger, TxQueue};
pub use rules::Rules;
pub use transaction::{CanonicalTxSet, Transaction, TxKind};
pub use tx_set::{TxSet, TxSetBuilder};
