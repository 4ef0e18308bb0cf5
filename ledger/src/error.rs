use crest_types::{LedgerHash, TxSetId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("transaction set {0} is missing a node (storage corruption)")]
    MissingNode(TxSetId),

    #[error("replay parent {got} does not match previous ledger {expected}")]
    ReplayParentMismatch {
        expected: LedgerHash,
        got: LedgerHash,
    },

    #[error("ledger build failed: {0}")]
    BuildFailed(String),
}
