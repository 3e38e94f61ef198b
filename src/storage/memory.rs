//! In-memory storage backend
//!
//! Keeps every entry in an ordered map behind an async lock. Snapshots share
//! the map copy-on-write, so a read-only transaction keeps seeing the state it
//! started with while writers continue.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::ReadOnlyTransaction;
use super::Storage;
use super::StorageError;

type Entries = BTreeMap<String, Vec<u8>>;

/// In-memory storage implementation with snapshot support.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<Arc<Entries>>,
    open_transactions: Arc<AtomicUsize>,
}

impl MemoryStorage {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `key`, replacing any previous value.
    pub async fn put(&self, key: &str, value: &[u8]) {
        let mut data = self.data.write().await;
        Arc::make_mut(&mut data).insert(key.to_string(), value.to_vec());
    }

    /// Remove `key`. Returns true if it existed.
    pub async fn delete(&self, key: &str) -> bool {
        let mut data = self.data.write().await;
        Arc::make_mut(&mut data).remove(key).is_some()
    }

    /// Number of read-only transactions that have not been released yet.
    pub fn open_transactions(&self) -> usize {
        self.open_transactions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn list_page(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        Ok(page(&data, prefix, after, limit))
    }

    async fn begin_read_only(&self) -> Result<Option<Box<dyn ReadOnlyTransaction>>, StorageError> {
        let data = Arc::clone(&*self.data.read().await);
        self.open_transactions.fetch_add(1, Ordering::SeqCst);
        debug!(entries = data.len(), "Opened read-only snapshot");
        Ok(Some(Box::new(MemorySnapshot {
            data,
            open_transactions: Arc::clone(&self.open_transactions),
            released: false,
        })))
    }
}

/// Point-in-time view handed out by [`MemoryStorage::begin_read_only`].
#[derive(Debug)]
pub struct MemorySnapshot {
    data: Arc<Entries>,
    open_transactions: Arc<AtomicUsize>,
    released: bool,
}

impl MemorySnapshot {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.open_transactions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemorySnapshot {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl Storage for MemorySnapshot {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    async fn list_page(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        Ok(page(&self.data, prefix, after, limit))
    }
}

#[async_trait]
impl ReadOnlyTransaction for MemorySnapshot {
    fn as_storage(&self) -> &dyn Storage {
        self
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        let mut snapshot = self;
        snapshot.release();
        Ok(())
    }
}

fn page(data: &Entries, prefix: &str, after: Option<&str>, limit: Option<usize>) -> Vec<String> {
    let mut keys = BTreeSet::new();
    for key in data.range(prefix.to_string()..).map(|(k, _)| k) {
        let Some(relative) = key.strip_prefix(prefix) else {
            break;
        };
        if let Some(slash_pos) = relative.find('/') {
            keys.insert(format!("{}/", &relative[..slash_pos]));
        } else if !relative.is_empty() {
            keys.insert(relative.to_string());
        }
    }

    keys.into_iter()
        .filter(|k| after.is_none_or(|a| k.as_str() > a))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
