pub mod file;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metadata::TenantDatasourceMetadata;

pub use file::FileStore;
pub use memory::MemoryStore;

/// A cached metadata record with its absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub metadata: TenantDatasourceMetadata,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Backend for the metadata cache. A durable backend lets metadata survive
/// process restarts; the cache layers TTL semantics on top.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>, StoreError>;
    async fn store(&self, key: &str, entry: StoredEntry) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// TTL-expiring key/value cache of per-tenant datasource metadata. Dumb by
/// design: read-through and fallback policy live in the registry. Expiry is
/// checked lazily on read; an expired entry is indistinguishable from a miss.
/// Store failures are logged and degrade to a miss, never to an error.
pub struct MetadataCache {
    store: Arc<dyn MetadataStore>,
}

fn cache_key(tenant_id: &str) -> String {
    format!("datasource-metadata:{}", tenant_id)
}

impl MetadataCache {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, tenant_id: &str) -> Option<TenantDatasourceMetadata> {
        let key = cache_key(tenant_id);
        let entry = match self.store.load(&key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("Metadata store read failed for {}: {}", key, e);
                return None;
            }
        };

        if entry.expires_at <= Utc::now() {
            // Lazy expiry; removal is best-effort
            if let Err(e) = self.store.remove(&key).await {
                warn!("Failed to drop expired metadata for {}: {}", key, e);
            }
            return None;
        }

        Some(entry.metadata)
    }

    pub async fn put(&self, tenant_id: &str, metadata: TenantDatasourceMetadata, ttl: Duration) {
        let key = cache_key(tenant_id);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        let entry = StoredEntry {
            metadata,
            expires_at: Utc::now() + ttl,
        };
        if let Err(e) = self.store.store(&key, entry).await {
            warn!("Metadata store write failed for {}: {}", key, e);
        }
    }

    pub async fn evict(&self, tenant_id: &str) {
        let key = cache_key(tenant_id);
        if let Err(e) = self.store.remove(&key).await {
            warn!("Metadata store eviction failed for {}: {}", key, e);
        }
    }
}
