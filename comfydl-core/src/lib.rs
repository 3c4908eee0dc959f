//! ComfyDL Core Library
//!
//! This crate provides the engine behind the `comfydl` model downloader:
//!
//! - Layered model source catalog (local files, custom/user/bundled folders, registries)
//! - Normalization of source declarations into `(url, dest)` file items
//! - Registry store with a local payload cache
//! - Installation reconciliation against a ComfyUI root
//! - Download and removal planners with confirmation and interrupt handling
//! - Transfer, size-probe and free-space collaborators
//! - Civitai model-version lookup
//! - Settings and database layer

pub mod civitai;
pub mod config;
pub mod db;
pub mod format;
pub mod install;
pub mod paths;
pub mod registry;
pub mod sources;
pub mod transfer;

// Re-exports for convenience
pub use config::{Settings, SettingsError};
pub use db::Database;
pub use paths::AppPaths;

// Re-export catalog types
pub use sources::{
    CatalogConfig, CatalogError, DeclarationError, FileItem, ResolutionOrigin, ResolvedSource,
    SourceCatalog, SourceDeclaration,
};

// Re-export registry
pub use registry::{HttpRegistryClient, RegistryClient, RegistryError, RegistryStore, UpdateReport};

// Re-export planners
pub use install::{
    render_status, ConfirmPolicy, DownloadPlan, DownloadPlanner, ExecutionResult, InstallState,
    ItemResult, PlanError, Reconciler, RemovalItemResult, RemovalPlan, RemovalPlanner, RemovalResult,
    SourceStatus,
};

// Re-export collaborators
pub use transfer::{
    Credentials, ExternalDownloader, HttpSizeProbe, SizeProbe, SpaceProbe, SystemSpaceProbe,
    TransferExecutor,
};

pub use civitai::{extract_version_id, CivitaiClient, CivitaiError};
pub use format::format_bytes;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn exports_are_accessible() {
        fn _check_types(
            _db: &Database,
            _settings: &Settings,
            _paths: &AppPaths,
            _store: &RegistryStore<'_>,
            _catalog: &SourceCatalog<'_>,
            _download: &DownloadPlanner,
            _removal: &RemovalPlanner,
            _policy: &ConfirmPolicy,
        ) {
        }
    }
}
