//! Cryptographic hash types for ledgers, transactions, and tx sets.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! hash_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub(crate) [u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Parse from a 64-character lowercase hex string.
            pub fn from_hex(s: &str) -> Option<Self> {
                if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return None;
                }
                let mut bytes = [0u8; 32];
                for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
                    let hi = (chunk[0] as char).to_digit(16)?;
                    let lo = (chunk[1] as char).to_digit(16)?;
                    bytes[i] = ((hi << 4) | lo) as u8;
                }
                Some(Self(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "("))?;
                for b in &self.0[..4] {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, ")")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for b in &self.0 {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }
    };
}

hash_newtype! {
    /// The content hash (identity) of a closed ledger.
    LedgerHash
}

hash_newtype! {
    /// A 32-byte transaction id.
    TxId
}

hash_newtype! {
    /// The identity of a candidate transaction set (Merkle hash of its leaves).
    TxSetId
}

hash_newtype! {
    /// The identity of a protocol amendment.
    AmendmentId
}

hash_newtype! {
    /// A payment account identifier (the account's public key bytes).
    AccountId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_is_zero() {
        assert!(LedgerHash::ZERO.is_zero());
        assert!(!LedgerHash::new([1u8; 32]).is_zero());
    }

    #[test]
    fn display_is_full_hex() {
        let h = TxId::new([0xAB; 32]);
        assert_eq!(h.to_string(), "ab".repeat(32));
    }

    #[test]
    fn debug_is_truncated() {
        let h = TxSetId::new([0xCD; 32]);
        assert_eq!(format!("{:?}", h), "TxSetId(cdcdcdcd)");
    }

    #[test]
    fn from_hex_roundtrip() {
        let h = LedgerHash::new([0x5F; 32]);
        assert_eq!(LedgerHash::from_hex(&h.to_string()), Some(h));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(LedgerHash::from_hex("zz").is_none());
        assert!(LedgerHash::from_hex(&"g".repeat(64)).is_none());
        assert!(LedgerHash::from_hex(&"ab".repeat(31)).is_none());
    }
}
