#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Attest core: canonical types, constants, hashing, signatures, and the
//! entry codec.
//!
//! Everything that participates in an `entry_hash` lives here, so that the
//! node, the client, and any external verifier hash byte-identical input.

pub mod codec;
pub mod constants;
pub mod crypto;
pub mod types;

pub use codec::*;
pub use constants::*;
pub use crypto::*;
pub use types::*;
