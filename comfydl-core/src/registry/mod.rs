//! Registry endpoints and their cached payloads.
//!
//! A registry is a named URL serving a JSON mapping of source name to source
//! body. Endpoints live in the database; the last fetched payload of each is
//! cached as `<name>.json` and only refreshed by an explicit update.
//!
//! - `types` - `RegistryEndpoint`, `RegistryError`
//! - `store` - `RegistryStore`, endpoint CRUD and payload cache
//! - `client` - `RegistryClient` trait and the reqwest implementation
//! - `payload` - Payload shape handling and the ordered merge of registries

mod client;
mod payload;
mod store;
mod types;

pub use client::{HttpRegistryClient, RegistryClient};
pub use payload::{
    merge_layers, sources_from_payload, MergedSources, RegistryLayer, RegistrySource,
    SourceCollision,
};
pub use store::{RegistryStore, UpdateReport, DEFAULT_REGISTRY_NAME, DEFAULT_REGISTRY_URL};
pub use types::{validate_registry_name, RegistryEndpoint, RegistryError};
