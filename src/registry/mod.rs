use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::cache::MetadataCache;
use crate::config::RegistryConfig;
use crate::fetcher::{ConfigFetcher, FetchError};
use crate::metadata::TenantDatasourceMetadata;
use crate::provisioner::{ConnectionHandle, ConnectionProvisioner, ProvisionError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Even the default cluster could not be provisioned. Not recovered
    /// locally; callers should treat the datasource as unavailable.
    #[error("Datasource unavailable for tenant {tenant_id}: {source}")]
    DatasourceUnavailable {
        tenant_id: String,
        #[source]
        source: ProvisionError,
    },
}

/// Facade over the per-tenant datasource machinery: an in-process map from
/// tenant ID to live handle, coordinating metadata-cache lookups, control
/// plane fetches, single-flight provisioning, and eviction.
///
/// Explicitly constructed and injected; there is no ambient global instance.
pub struct TenantConnectionRegistry {
    config: RegistryConfig,
    cache: MetadataCache,
    fetcher: Arc<dyn ConfigFetcher>,
    provisioner: ConnectionProvisioner,
    handles: RwLock<HashMap<String, ConnectionHandle>>,
    /// Per-tenant provisioning locks. The outer mutex is held only long
    /// enough to fetch or insert a key lock, never across a network call,
    /// so one tenant's slow control plane never stalls another tenant.
    provisioning: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TenantConnectionRegistry {
    pub fn new(config: RegistryConfig, cache: MetadataCache, fetcher: Arc<dyn ConfigFetcher>) -> Self {
        let provisioner = ConnectionProvisioner::new(config.clone());
        Self {
            config,
            cache,
            fetcher,
            provisioner,
            handles: RwLock::new(HashMap::new()),
            provisioning: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the handle for a tenant, provisioning it on first access.
    /// Cached handles are returned from a read-locked map hit; a first access
    /// may block its caller for one bounded control-plane fetch. Never
    /// returns a partially-initialized handle.
    pub async fn get_connection(&self, tenant_id: &str) -> Result<ConnectionHandle, RegistryError> {
        // Fast path: read lock only
        {
            let handles = self.handles.read().await;
            if let Some(handle) = handles.get(tenant_id) {
                return Ok(handle.clone());
            }
        }

        let key_lock = self.key_lock(tenant_id).await;
        let _guard = key_lock.lock().await;

        // A concurrent caller may have finished provisioning while we waited
        {
            let handles = self.handles.read().await;
            if let Some(handle) = handles.get(tenant_id) {
                return Ok(handle.clone());
            }
        }

        let handle = self.provision(tenant_id).await?;

        {
            let mut handles = self.handles.write().await;
            handles.insert(tenant_id.to_string(), handle.clone());
        }
        self.release_key_lock(tenant_id).await;

        Ok(handle)
    }

    /// Evict a tenant: drop its metadata-cache entry, remove the map entry,
    /// and close the pool. Map removal is synchronous - callers arriving
    /// after removal never observe the old handle - while the pool close
    /// completes in the background and is best-effort.
    pub async fn remove_connection(&self, tenant_id: &str) {
        self.cache.evict(tenant_id).await;

        let removed = {
            let mut handles = self.handles.write().await;
            handles.remove(tenant_id)
        };

        match removed {
            Some(handle) => {
                info!("Evicted datasource registration for tenant: {}", tenant_id);
                tokio::spawn(async move { handle.close().await });
            }
            None => {
                info!("No datasource registration to evict for tenant: {}", tenant_id);
            }
        }
    }

    /// Resolve the tenant's handle and invoke `f` with it. A scoping helper,
    /// not close-after-use: handles stay registered across calls.
    pub async fn with_tenant<F, Fut, T>(&self, tenant_id: &str, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(ConnectionHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        let handle = self.get_connection(tenant_id).await?;
        Ok(f(handle).await)
    }

    /// Close every registered handle (process shutdown).
    pub async fn shutdown(&self) {
        let mut handles = self.handles.write().await;
        for (tenant_id, handle) in handles.drain() {
            handle.close().await;
            info!("Shut down datasource registration for tenant: {}", tenant_id);
        }
    }

    /// One attempt of the provisioning chain: cached metadata, else a bounded
    /// control-plane fetch, with any failure falling back to the default
    /// cluster. Runs under the tenant's key lock.
    async fn provision(&self, tenant_id: &str) -> Result<ConnectionHandle, RegistryError> {
        let metadata = match self.cache.get(tenant_id).await {
            Some(metadata) => metadata,
            None => match self.fetch_bounded(tenant_id).await {
                Ok(metadata) => {
                    self.cache
                        .put(tenant_id, metadata.clone(), self.config.metadata_ttl)
                        .await;
                    metadata
                }
                Err(e) => {
                    match e {
                        FetchError::NotFound => {
                            info!("No datasource config registered for tenant {}, using default cluster", tenant_id)
                        }
                        _ => warn!("Datasource config fetch failed for tenant {}: {}", tenant_id, e),
                    }
                    return self.fall_back(tenant_id).await;
                }
            },
        };

        match self.provisioner.build(&metadata) {
            Ok(handle) => Ok(handle),
            Err(e) => {
                warn!(
                    "Datasource build failed for tenant {} from configured metadata: {}",
                    tenant_id, e
                );
                self.fall_back(tenant_id).await
            }
        }
    }

    async fn fetch_bounded(&self, tenant_id: &str) -> Result<TenantDatasourceMetadata, FetchError> {
        let fetch = self
            .fetcher
            .fetch_datasource_config(tenant_id, &self.config.datasource_type);
        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    /// Register the default-cluster target for a tenant, caching it with the
    /// short fallback TTL so the control plane is retried soon. A failure
    /// here is fatal for the call.
    async fn fall_back(&self, tenant_id: &str) -> Result<ConnectionHandle, RegistryError> {
        let metadata = self
            .provisioner
            .default_metadata(tenant_id)
            .map_err(|source| {
                error!("Fallback datasource unusable for tenant {}: {}", tenant_id, source);
                RegistryError::DatasourceUnavailable {
                    tenant_id: tenant_id.to_string(),
                    source,
                }
            })?;

        self.cache
            .put(tenant_id, metadata.clone(), self.config.fallback_metadata_ttl)
            .await;

        self.provisioner.build(&metadata).map_err(|source| {
            error!("Fallback datasource unusable for tenant {}: {}", tenant_id, source);
            RegistryError::DatasourceUnavailable {
                tenant_id: tenant_id.to_string(),
                source,
            }
        })
    }

    async fn key_lock(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        let mut provisioning = self.provisioning.lock().await;
        provisioning
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_key_lock(&self, tenant_id: &str) {
        let mut provisioning = self.provisioning.lock().await;
        provisioning.remove(tenant_id);
    }
}
