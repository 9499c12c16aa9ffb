//! The storage capability trait.

use attest_core::ConfigEntry;

use crate::error::StoreError;

/// Append-only durable storage for log entries.
///
/// Contract:
/// - `append` persists exactly one entry atomically and does not return
///   success until the bytes are on stable storage
/// - `load_all` returns every appended entry in append order
/// - `close` flushes and releases resources; all later calls fail with
///   [`StoreError::Closed`]
///
/// Implementations must be `Send + Sync`; the node shares one store across
/// RPC handler threads.
pub trait Store: Send + Sync {
    /// Durably append one entry.
    fn append(&self, entry: &ConfigEntry) -> Result<(), StoreError>;

    /// Load all persisted entries in append order.
    fn load_all(&self) -> Result<Vec<ConfigEntry>, StoreError>;

    /// Flush and release resources.
    fn close(&self) -> Result<(), StoreError>;
}
