use std::env;
use std::time::Duration;

/// Registry-wide settings: default cluster target, cache TTLs, pool bounds,
/// and the control-plane fetch timeout.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Default cluster used when per-tenant configuration cannot be obtained.
    /// The tenant database name is swapped into the URI path.
    pub default_datasource_url: String,
    /// Datasource type requested from the enterprise-configuration service.
    pub datasource_type: String,
    /// Base URL of the enterprise-configuration service.
    pub config_service_url: String,
    /// Upper bound on one control-plane fetch. A hung call is treated as a
    /// fetch error and falls back.
    pub fetch_timeout: Duration,
    /// How long fetched metadata is trusted.
    pub metadata_ttl: Duration,
    /// Shorter TTL for fallback entries so a control-plane outage self-heals.
    pub fallback_metadata_ttl: Duration,
    pub pool_max_default: u32,
    pub pool_min_default: u32,
    /// Connect timeout applied when metadata does not provide one.
    pub connect_timeout: Duration,
    /// Ceiling on pool acquire waits, regardless of metadata.
    pub acquire_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_datasource_url: "postgres://localhost:5432/postgres".to_string(),
            datasource_type: "postgres".to_string(),
            config_service_url: "http://localhost:8080".to_string(),
            fetch_timeout: Duration::from_secs(5),
            metadata_ttl: Duration::from_secs(24 * 60 * 60),
            fallback_metadata_ttl: Duration::from_secs(60),
            pool_max_default: 20,
            pool_min_default: 5,
            connect_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl RegistryConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATASOURCE_DEFAULT_URL") {
            self.default_datasource_url = v;
        }
        if let Ok(v) = env::var("DATASOURCE_TYPE") {
            self.datasource_type = v;
        }
        if let Ok(v) = env::var("DATASOURCE_CONFIG_SERVICE_URL") {
            self.config_service_url = v;
        }
        if let Ok(v) = env::var("DATASOURCE_FETCH_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.fetch_timeout = Duration::from_millis(ms);
            }
        }
        if let Ok(v) = env::var("DATASOURCE_METADATA_TTL_SECS") {
            if let Ok(secs) = v.parse() {
                self.metadata_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = env::var("DATASOURCE_FALLBACK_TTL_SECS") {
            if let Ok(secs) = v.parse() {
                self.fallback_metadata_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = env::var("DATASOURCE_POOL_MAX") {
            self.pool_max_default = v.parse().unwrap_or(self.pool_max_default);
        }
        if let Ok(v) = env::var("DATASOURCE_POOL_MIN") {
            self.pool_min_default = v.parse().unwrap_or(self.pool_min_default);
        }
        if let Ok(v) = env::var("DATASOURCE_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.connect_timeout = Duration::from_millis(ms);
            }
        }
        if let Ok(v) = env::var("DATASOURCE_ACQUIRE_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.acquire_timeout = Duration::from_millis(ms);
            }
        }
        self
    }
}
