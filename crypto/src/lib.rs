//! Cryptographic primitives for the CREST protocol.
//!
//! - **Ed25519** for signing and signature verification
//! - **SHA-512-half** for all protocol digests (first 32 bytes of SHA-512)
//! - Domain-separated hash prefixes so no two message kinds share a digest

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{sha512_half, sha512_half_multi, HashPrefix};
pub use keys::{generate_keypair, keypair_from_seed, node_id_from_public, public_from_private};
pub use sign::{sign_digest, verify_digest};
