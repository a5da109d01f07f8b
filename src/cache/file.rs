use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{MetadataStore, StoreError, StoredEntry};

/// File-backed store: one pretty-printed JSON file per cache key under a
/// spool directory, so metadata survives process restarts.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Cache keys contain ':', which is not filename-safe everywhere
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl MetadataStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let entry: StoredEntry = serde_json::from_str(&content)?;
        Ok(Some(entry))
    }

    async fn store(&self, key: &str, entry: StoredEntry) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&entry)?;
        fs::write(self.path_for(key), content)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::MetadataCache;
    use crate::metadata::TenantDatasourceMetadata;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("tenant-datasource-registry-tests")
            .join(format!("{}-{}", name, uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn entries_survive_a_fresh_cache_instance() {
        let dir = temp_dir("restart");
        let metadata = TenantDatasourceMetadata::fallback_for(
            "acme",
            "postgres://localhost:5432/postgres",
        )
        .unwrap();

        {
            let cache = MetadataCache::new(Arc::new(FileStore::new(&dir).unwrap()));
            cache.put("acme", metadata.clone(), Duration::from_secs(300)).await;
        }

        // Simulated restart: new store over the same directory
        let cache = MetadataCache::new(Arc::new(FileStore::new(&dir).unwrap()));
        let got = cache.get("acme").await.unwrap();
        assert_eq!(got, metadata);

        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = temp_dir("remove");
        let store = FileStore::new(&dir).unwrap();
        store.remove("datasource-metadata:ghost").await.unwrap();
        store.remove("datasource-metadata:ghost").await.unwrap();
        fs::remove_dir_all(dir).ok();
    }
}
