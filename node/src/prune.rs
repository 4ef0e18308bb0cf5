//! Prune-advisory targets.
//!
//! Operators advise the node how far back history may be deleted. The
//! parameter accepts the keywords `never`, `always`, and `now`, a decimal
//! ledger sequence, or a 64-character ledger hash — parsed explicitly,
//! with no implicit string-to-integer fallbacks.

use crest_types::LedgerHash;
use thiserror::Error;

/// Where deletion of old ledgers may advance to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneTarget {
    /// Never delete.
    Never,
    /// Delete freely.
    Always,
    /// Delete up to the current validated ledger.
    Now,
    /// Delete up to (and including) this sequence.
    AtSeq(u32),
    /// Delete up to the ledger with this hash.
    AtHash(LedgerHash),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PruneParseError {
    #[error("invalid prune target: {0:?}")]
    Invalid(String),

    #[error("sequence out of range: {0:?}")]
    OutOfRange(String),
}

impl PruneTarget {
    /// Parse an operator-supplied prune target.
    pub fn parse(raw: &str) -> Result<Self, PruneParseError> {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "never" => return Ok(PruneTarget::Never),
            "always" => return Ok(PruneTarget::Always),
            "now" => return Ok(PruneTarget::Now),
            _ => {}
        }
        if !lowered.is_empty() && lowered.bytes().all(|b| b.is_ascii_digit()) {
            return lowered
                .parse::<u32>()
                .map(PruneTarget::AtSeq)
                .map_err(|_| PruneParseError::OutOfRange(raw.to_string()));
        }
        if lowered.len() == 64 && lowered.bytes().all(|b| b.is_ascii_hexdigit()) {
            if let Some(hash) = LedgerHash::from_hex(&lowered) {
                return Ok(PruneTarget::AtHash(hash));
            }
        }
        Err(PruneParseError::Invalid(raw.to_string()))
    }
}
