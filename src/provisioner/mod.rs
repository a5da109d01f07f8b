use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::metadata::TenantDatasourceMetadata;

/// A live, pooled client bound to exactly one tenant. Cloning shares the same
/// underlying pool; `id` identifies the provisioned instance, so two handles
/// with equal ids are the same registration.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tenant_id: String,
    database_name: String,
    is_fallback: bool,
    pool: PgPool,
}

impl ConnectionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the underlying pool. Safe to call once per registration; the
    /// registry does so on eviction and shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed datasource pool for tenant: {}", self.tenant_id);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid connection URI for tenant {tenant_id}: {reason}")]
    InvalidUri { tenant_id: String, reason: String },

    #[error("No resolvable database name for tenant {0}")]
    MissingDatabaseName(String),
}

/// Builds pooled connection handles from metadata, or from the default
/// cluster when per-tenant configuration is unusable.
#[derive(Clone)]
pub struct ConnectionProvisioner {
    config: RegistryConfig,
}

impl ConnectionProvisioner {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// Construct a pooled handle from metadata. Pool construction is lazy;
    /// no connection is opened until the pool is first used. Malformed pool
    /// sizes are clamped, never fatal - a bad pool bound degrades pool
    /// behavior but must not block connectivity.
    pub fn build(
        &self,
        metadata: &TenantDatasourceMetadata,
    ) -> Result<ConnectionHandle, ProvisionError> {
        let database_name = metadata
            .resolved_database_name()
            .ok_or_else(|| ProvisionError::MissingDatabaseName(metadata.tenant_id.clone()))?;

        let options = PgConnectOptions::from_str(&metadata.connection_uri)
            .map_err(|e| ProvisionError::InvalidUri {
                tenant_id: metadata.tenant_id.clone(),
                reason: e.to_string(),
            })?
            .database(&database_name);

        let (max, min) = self.pool_bounds(metadata);
        let acquire_timeout = metadata
            .connect_timeout_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or(self.config.connect_timeout)
            .min(self.config.acquire_timeout);

        let pool = PgPoolOptions::new()
            .max_connections(max)
            .min_connections(min)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        info!(
            "Provisioned datasource pool for tenant {} (db={}, max={}, min={}, fallback={})",
            metadata.tenant_id, database_name, max, min, metadata.is_fallback
        );

        Ok(ConnectionHandle {
            id: Uuid::new_v4(),
            tenant_id: metadata.tenant_id.clone(),
            database_name,
            is_fallback: metadata.is_fallback,
            pool,
        })
    }

    /// Construct a handle against the default cluster with the database name
    /// derived as `{tenant_id}_db`. Failure here means even the fallback
    /// target is unusable, which the registry surfaces as fatal.
    pub fn build_default(&self, tenant_id: &str) -> Result<ConnectionHandle, ProvisionError> {
        let metadata = self.default_metadata(tenant_id)?;
        self.build(&metadata)
    }

    /// Fallback metadata for a tenant, suitable for short-TTL caching.
    pub fn default_metadata(
        &self,
        tenant_id: &str,
    ) -> Result<TenantDatasourceMetadata, ProvisionError> {
        TenantDatasourceMetadata::fallback_for(tenant_id, &self.config.default_datasource_url)
            .map_err(|e| ProvisionError::InvalidUri {
                tenant_id: tenant_id.to_string(),
                reason: e.to_string(),
            })
    }

    fn pool_bounds(&self, metadata: &TenantDatasourceMetadata) -> (u32, u32) {
        let max = metadata
            .pool_max_size
            .unwrap_or(self.config.pool_max_default)
            .max(1);
        let mut min = metadata
            .pool_min_size
            .unwrap_or(self.config.pool_min_default);
        if min > max {
            warn!(
                "Clamping pool min {} to max {} for tenant {}",
                min, max, metadata.tenant_id
            );
            min = max;
        }
        (max, min)
    }
}
