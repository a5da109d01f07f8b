use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tenant_datasource_registry::{
    ConfigFetcher, FetchError, MemoryStore, MetadataCache, RegistryConfig,
    TenantConnectionRegistry, TenantDatasourceMetadata,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Scripted control-plane behavior for one tenant.
#[derive(Clone)]
pub enum FetchScript {
    Found(TenantDatasourceMetadata),
    NotFound,
    Fail(String),
    /// Sleep this long before answering, to exercise the fetch timeout.
    Hang(Duration),
}

/// In-memory stand-in for the enterprise-configuration service, with
/// per-tenant call counters.
pub struct MockFetcher {
    scripts: Mutex<HashMap<String, FetchScript>>,
    total_calls: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            total_calls: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub async fn script(&self, tenant_id: &str, script: FetchScript) {
        let mut scripts = self.scripts.lock().await;
        scripts.insert(tenant_id.to_string(), script);
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    pub async fn calls_for(&self, tenant_id: &str) -> usize {
        let calls = self.calls.lock().await;
        calls.get(tenant_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ConfigFetcher for MockFetcher {
    async fn fetch_datasource_config(
        &self,
        tenant_id: &str,
        _datasource_type: &str,
    ) -> Result<TenantDatasourceMetadata, FetchError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut calls = self.calls.lock().await;
            *calls.entry(tenant_id.to_string()).or_insert(0) += 1;
        }

        let script = {
            let scripts = self.scripts.lock().await;
            scripts.get(tenant_id).cloned()
        };

        match script {
            Some(FetchScript::Found(metadata)) => Ok(metadata),
            Some(FetchScript::NotFound) | None => Err(FetchError::NotFound),
            Some(FetchScript::Fail(reason)) => Err(FetchError::Transport(reason)),
            Some(FetchScript::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                Err(FetchError::Transport("answered too late".to_string()))
            }
        }
    }
}

pub fn test_config() -> RegistryConfig {
    RegistryConfig {
        default_datasource_url: "postgres://fallback.local:5432/postgres".to_string(),
        fetch_timeout: Duration::from_millis(250),
        fallback_metadata_ttl: Duration::from_millis(200),
        ..RegistryConfig::default()
    }
}

pub fn registry_with(
    config: RegistryConfig,
    fetcher: Arc<MockFetcher>,
) -> Arc<TenantConnectionRegistry> {
    let cache = MetadataCache::new(Arc::new(MemoryStore::new()));
    Arc::new(TenantConnectionRegistry::new(config, cache, fetcher))
}

pub fn registry(fetcher: Arc<MockFetcher>) -> Arc<TenantConnectionRegistry> {
    registry_with(test_config(), fetcher)
}

pub fn metadata_for(tenant_id: &str, uri: &str) -> TenantDatasourceMetadata {
    TenantDatasourceMetadata {
        tenant_id: tenant_id.to_string(),
        connection_uri: uri.to_string(),
        database_name: None,
        auth_database: "admin".to_string(),
        pool_max_size: None,
        pool_min_size: None,
        connect_timeout_ms: None,
        socket_timeout_ms: None,
        is_fallback: false,
    }
}
