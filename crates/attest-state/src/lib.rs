#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Attest state machine and merkle commitment.
//!
//! Responsibilities:
//! - Derive the key -> value-digest map from validated log entries
//! - Maintain the version counter (index of the last applied entry)
//! - Commit to the map with a deterministic binary merkle tree and answer
//!   inclusion-proof queries
//!
//! This crate does not validate entries; the log owns the authority check,
//! this crate owns the interpretation of entries the log has admitted.

pub mod error;
pub mod machine;
pub mod merkle;
pub mod proof;

pub use error::*;
pub use machine::*;
pub use merkle::*;
pub use proof::*;
