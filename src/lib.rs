pub mod cache;
pub mod config;
pub mod fetcher;
pub mod metadata;
pub mod provisioner;
pub mod registry;

pub use cache::{FileStore, MemoryStore, MetadataCache, MetadataStore};
pub use config::RegistryConfig;
pub use fetcher::{ConfigFetcher, FetchError, HttpConfigFetcher};
pub use metadata::TenantDatasourceMetadata;
pub use provisioner::{ConnectionHandle, ConnectionProvisioner, ProvisionError};
pub use registry::{RegistryError, TenantConnectionRegistry};
