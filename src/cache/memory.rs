use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MetadataStore, StoreError, StoredEntry};

/// In-process store. Entries do not survive restarts; intended for tests and
/// single-process deployments that accept a cold cache on boot.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn store(&self, key: &str, entry: StoredEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
