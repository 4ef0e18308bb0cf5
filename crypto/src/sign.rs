//! Ed25519 digest signing and verification.
//!
//! Protocol messages are never signed directly; the signer computes the
//! canonical SHA-512-half digest first and signs those 32 bytes.

use crest_types::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Sign a 32-byte digest with a private key, returning the signature.
pub fn sign_digest(digest: &[u8; 32], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(digest);
    Signature(sig.to_bytes())
}

/// Verify a signature over a 32-byte digest.
///
/// Returns `true` if the signature is valid, `false` otherwise. Malformed
/// public keys verify as `false` rather than erroring.
pub fn verify_digest(digest: &[u8; 32], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(digest, &dalek_sig).is_ok()
}
