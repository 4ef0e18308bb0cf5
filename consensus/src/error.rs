use crest_types::TxSetId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    /// A transaction-set node is missing from storage. Fatal at the round
    /// entry points; the process is expected to restart.
    #[error("transaction set {0} is missing a node (storage corruption)")]
    MissingTxSetNode(TxSetId),

    #[error("ledger build failed: {0}")]
    BuildFailed(#[from] crest_ledger::LedgerError),

    #[error("no round in progress")]
    NoRound,
}
