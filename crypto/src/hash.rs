//! SHA-512-half hashing with domain-separation prefixes.
//!
//! Every protocol digest is the first 32 bytes of a SHA-512 over a four-byte
//! domain prefix followed by the message fields in canonical order. Distinct
//! prefixes guarantee that a signature over one kind of message can never be
//! replayed as another.

use sha2::{Digest, Sha512};

/// Four-byte domain-separation prefixes folded into every digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashPrefix {
    /// A peer position (proposal) signing digest.
    Proposal,
    /// A validation signing digest.
    Validation,
    /// A transaction-set leaf node.
    TxNode,
    /// An inner node of a transaction-set tree.
    InnerNode,
    /// A closed ledger's header (its content hash).
    LedgerHeader,
    /// A transaction id.
    Transaction,
    /// A validator node id derived from its public key.
    NodeIdent,
}

impl HashPrefix {
    pub fn as_bytes(&self) -> &'static [u8; 4] {
        match self {
            HashPrefix::Proposal => b"PRP\0",
            HashPrefix::Validation => b"VAL\0",
            HashPrefix::TxNode => b"TXN\0",
            HashPrefix::InnerNode => b"INR\0",
            HashPrefix::LedgerHeader => b"LGR\0",
            HashPrefix::Transaction => b"TID\0",
            HashPrefix::NodeIdent => b"NID\0",
        }
    }
}

/// Compute the SHA-512-half of `prefix ∥ data`: the first 32 bytes of the
/// 64-byte SHA-512 output.
pub fn sha512_half(prefix: HashPrefix, data: &[u8]) -> [u8; 32] {
    sha512_half_multi(prefix, &[data])
}

/// SHA-512-half over a prefix and multiple parts in sequence (avoids
/// concatenation allocation).
pub fn sha512_half_multi(prefix: HashPrefix, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(prefix.as_bytes());
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_half_deterministic() {
        let h1 = sha512_half(HashPrefix::Transaction, b"hello crest");
        let h2 = sha512_half(HashPrefix::Transaction, b"hello crest");
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_inputs_differ() {
        let h1 = sha512_half(HashPrefix::Transaction, b"hello");
        let h2 = sha512_half(HashPrefix::Transaction, b"world");
        assert_ne!(h1, h2);
    }

    #[test]
    fn prefixes_separate_domains() {
        let h1 = sha512_half(HashPrefix::Proposal, b"same bytes");
        let h2 = sha512_half(HashPrefix::Validation, b"same bytes");
        assert_ne!(h1, h2);
    }

    #[test]
    fn multi_equivalent_to_single() {
        let single = sha512_half(HashPrefix::TxNode, b"helloworld");
        let multi = sha512_half_multi(HashPrefix::TxNode, &[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn empty_input_is_not_zero() {
        let h = sha512_half(HashPrefix::LedgerHeader, b"");
        assert_ne!(h, [0u8; 32]);
    }
}
