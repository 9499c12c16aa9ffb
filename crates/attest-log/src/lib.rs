#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Attest append-only log.
//!
//! Responsibilities:
//! - Hold the authoritative in-memory entry sequence
//! - Gatekeep every mutation: index, hash chain, canonical hash, author
//!   trust, and signature are all checked before an entry is admitted
//!
//! The log does not persist anything; durability belongs to the store and
//! is sequenced by the node. Its in-memory tail is nonetheless the
//! validation oracle for the next entry's `prev_hash`.

pub mod error;
pub mod log;

pub use error::*;
pub use log::*;
