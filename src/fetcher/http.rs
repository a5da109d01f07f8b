use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{ConfigFetcher, FetchError};
use crate::metadata::TenantDatasourceMetadata;

/// Datasource record as the enterprise-configuration service serves it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasourceConfigPayload {
    connection_uri: String,
    database_name: Option<String>,
    auth_database: Option<String>,
    pool_max_size: Option<u32>,
    pool_min_size: Option<u32>,
    connect_timeout_ms: Option<u64>,
    socket_timeout_ms: Option<u64>,
}

/// HTTP client for the enterprise-configuration service.
pub struct HttpConfigFetcher {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpConfigFetcher {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch_datasource_config(
        &self,
        tenant_id: &str,
        datasource_type: &str,
    ) -> Result<TenantDatasourceMetadata, FetchError> {
        let url = format!(
            "{}/api/v1/tenants/{}/datasources/{}",
            self.base_url, tenant_id, datasource_type
        );
        debug!("Fetching datasource config: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound),
            status if !status.is_success() => Err(FetchError::Transport(format!(
                "configuration service returned {}",
                status
            ))),
            _ => {
                let payload: DatasourceConfigPayload = response
                    .json()
                    .await
                    .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

                if payload.connection_uri.is_empty() {
                    return Err(FetchError::InvalidResponse(
                        "empty connectionUri".to_string(),
                    ));
                }

                Ok(TenantDatasourceMetadata {
                    tenant_id: tenant_id.to_string(),
                    connection_uri: payload.connection_uri,
                    database_name: payload.database_name,
                    auth_database: payload.auth_database.unwrap_or_else(|| "admin".to_string()),
                    pool_max_size: payload.pool_max_size,
                    pool_min_size: payload.pool_min_size,
                    connect_timeout_ms: payload.connect_timeout_ms,
                    socket_timeout_ms: payload.socket_timeout_ms,
                    is_fallback: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_deserializes_camel_case() {
        let payload: DatasourceConfigPayload = serde_json::from_str(
            r#"{"connectionUri":"postgres://h:5432/acmedb","poolMaxSize":20}"#,
        )
        .unwrap();
        assert_eq!(payload.connection_uri, "postgres://h:5432/acmedb");
        assert_eq!(payload.pool_max_size, Some(20));
        assert_eq!(payload.auth_database, None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let fetcher = HttpConfigFetcher::new("http://config.local/", Duration::from_secs(5));
        assert_eq!(fetcher.base_url, "http://config.local");
    }
}
