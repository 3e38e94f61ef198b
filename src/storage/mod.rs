//! Storage abstraction for the fetch path.
//!
//! The fetch path only ever reads. Values are opaque byte strings addressed by
//! `/`-separated keys; listings are ordered and paginated. Backends that can
//! offer a point-in-time view expose it through [`Storage::begin_read_only`].

pub mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;

/// Error type for storage operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

/// Read interface over the key/value backend.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the value stored at `key`.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// List the keys directly under `prefix`, with the prefix stripped.
    ///
    /// Keys are returned in lexicographic order. Only keys strictly greater
    /// than `after` are returned; `after` does not need to exist. `limit` of
    /// `None` returns every remaining key. Nested keys collapse into a single
    /// entry ending in `/`.
    async fn list_page(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError>;

    /// Start a read-only transaction giving a consistent snapshot.
    ///
    /// Returns `None` when the backend has no transactional support.
    async fn begin_read_only(&self) -> Result<Option<Box<dyn ReadOnlyTransaction>>, StorageError> {
        Ok(None)
    }
}

/// A read-only, point-in-time view of a [`Storage`] backend.
///
/// The transaction must be released with [`ReadOnlyTransaction::rollback`].
/// Dropping it without a rollback also releases it.
#[async_trait]
pub trait ReadOnlyTransaction: Storage {
    /// Borrow the transaction as a plain storage view.
    fn as_storage(&self) -> &dyn Storage;

    /// Release the snapshot. Nothing was written, so nothing is discarded.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
