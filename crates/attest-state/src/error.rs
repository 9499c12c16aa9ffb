//! State and proof errors.

use thiserror::Error;

/// Errors produced by state queries.
#[derive(Debug, Error)]
pub enum StateError {
    /// The requested key is not present in the current state.
    #[error("key not found")]
    KeyNotFound,
}
