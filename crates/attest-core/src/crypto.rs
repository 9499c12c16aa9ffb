//! Hash and signature primitives.
//!
//! Important: this crate intentionally does NOT implement novel
//! cryptography. It wraps SHA-256 and Ed25519 behind byte-oriented helpers
//! so callers never handle `ed25519-dalek` types directly.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::constants::{PUBLIC_KEY_LEN, SECRET_KEY_LEN};
use crate::types::Hash32;

/// Compute the SHA-256 digest of `data`.
pub fn hash(data: &[u8]) -> Hash32 {
    let out = Sha256::digest(data);
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    Hash32(arr)
}

/// Generate a fresh Ed25519 key pair from the OS RNG.
///
/// Returns `(public_key, secret_key)` as raw bytes.
pub fn generate_keypair() -> ([u8; PUBLIC_KEY_LEN], [u8; SECRET_KEY_LEN]) {
    let signing = SigningKey::generate(&mut OsRng);
    (signing.verifying_key().to_bytes(), signing.to_bytes())
}

/// Sign `message` with a raw 32-byte Ed25519 secret key.
///
/// Fails when `secret` has the wrong length. Ed25519 signing itself is
/// deterministic, so the same key and message always yield the same bytes.
pub fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, crate::CoreError> {
    let secret: [u8; SECRET_KEY_LEN] = secret
        .try_into()
        .map_err(|_| crate::CoreError::InvalidValue("secret key must be 32 bytes"))?;
    let signing = SigningKey::from_bytes(&secret);
    Ok(signing.sign(message).to_bytes().to_vec())
}

/// Verify `signature` over `message` against a raw 32-byte public key.
///
/// Malformed keys or signatures simply fail verification; the caller never
/// needs to distinguish "invalid" from "unparseable".
pub fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let public: [u8; PUBLIC_KEY_LEN] = match public.try_into() {
        Ok(p) => p,
        Err(_) => return false,
    };
    let key = match VerifyingKey::from_bytes(&public) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let sig = match Signature::from_slice(signature) {
        Ok(s) => s,
        Err(_) => return false,
    };
    key.verify_strict(message, &sig).is_ok()
}
