//! Protocol-wide constants for attest v1.

/// Length in bytes of a 32-byte digest.
pub const HASH32_LEN: usize = 32;

/// Length in bytes of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length in bytes of an Ed25519 secret key.
pub const SECRET_KEY_LEN: usize = 32;

/// Length in bytes of an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Maximum canonical-encoded entry size (in bytes) accepted by storage.
///
/// This is a framing sanity bound, not a protocol limitation: a torn length
/// prefix in the file backend must not drive an arbitrary allocation.
pub const MAX_ENTRY_BYTES: usize = 1 << 20;
