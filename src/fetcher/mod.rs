pub mod http;

use async_trait::async_trait;

use crate::metadata::TenantDatasourceMetadata;

pub use http::HttpConfigFetcher;

/// Outcome variants of a control-plane fetch. The registry pattern-matches on
/// these; fallback is a designed branch, not an exception handler.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("No datasource configuration registered for tenant")]
    NotFound,

    #[error("Configuration service transport error: {0}")]
    Transport(String),

    #[error("Configuration service did not respond in time")]
    Timeout,

    #[error("Configuration service returned an unreadable payload: {0}")]
    InvalidResponse(String),
}

/// Client interface to the enterprise-configuration service. The registry and
/// provisioner depend only on this trait, never on HTTP details.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch_datasource_config(
        &self,
        tenant_id: &str,
        datasource_type: &str,
    ) -> Result<TenantDatasourceMetadata, FetchError>;
}
