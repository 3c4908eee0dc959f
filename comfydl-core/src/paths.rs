//! Per-user path management.
//!
//! Everything ComfyDL persists lives under a single base directory:
//!
//! - `~/.comfydl/comfydl.db` - settings and registry endpoints
//! - `~/.comfydl/registries/<name>.json` - cached registry payloads
//! - `~/.comfydl/model_sources/` - user-level source overrides
//!
//! Components receive an [`AppPaths`] instead of calling `dirs` themselves,
//! so tests can point the whole layout at a temp directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory name under the user's home.
const BASE_DIR_NAME: &str = ".comfydl";

/// Resolved locations of all per-user state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    base: PathBuf,
}

impl AppPaths {
    /// Uses `~/.comfydl` as the base directory.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::with_base(home.join(BASE_DIR_NAME)))
    }

    /// Uses an explicit base directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path: `{base}/comfydl.db`
    pub fn database_path(&self) -> PathBuf {
        self.base.join("comfydl.db")
    }

    /// Path: `{base}/registries/`
    pub fn registries_dir(&self) -> PathBuf {
        self.base.join("registries")
    }

    /// Path: `{base}/model_sources/`
    pub fn user_sources_dir(&self) -> PathBuf {
        self.base.join("model_sources")
    }

    /// Creates the base, registry cache, and user source directories.
    pub fn ensure_dirs_exist(&self) -> Result<()> {
        for dir in [
            self.base.clone(),
            self.registries_dir(),
            self.user_sources_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
