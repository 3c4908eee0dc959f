//! Layered source catalog.
//!
//! Resolution walks the providers in precedence order and stops at the first
//! layer that yields a usable declaration:
//!
//! 1. A literal path to an existing file
//! 2. The custom source directory (`CUSTOM_SOURCES_DIR`)
//! 3. The user override directory (`~/.comfydl/model_sources`)
//! 4. The bundled source folder (`BUNDLED_SOURCES_DIR`, default `./model_sources`)
//! 5. The merged contents of all cached registry payloads
//!
//! Declarations are re-read from their origin on every call. A malformed file
//! or registry entry is skipped with a warning and the walk continues.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::paths::AppPaths;
use crate::registry::{merge_layers, MergedSources, RegistryStore};

use super::declaration::{parse_declaration, read_declaration_file};
use super::types::{CatalogError, ResolutionOrigin, ResolvedSource};

/// File extensions tried for `<name>` inside a source directory.
const DECLARATION_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Directory layers of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub custom_dir: Option<PathBuf>,
    pub user_dir: PathBuf,
    pub bundled_dir: Option<PathBuf>,
}

impl CatalogConfig {
    /// Builds the layer list from settings and the per-user layout.
    pub fn from_settings(settings: &Settings, paths: &AppPaths) -> Self {
        Self {
            custom_dir: settings.custom_sources_dir.clone(),
            user_dir: paths.user_sources_dir(),
            bundled_dir: Some(settings.bundled_sources_dir()),
        }
    }
}

/// Resolves source names across every configured provider.
pub struct SourceCatalog<'a> {
    config: CatalogConfig,
    registries: &'a RegistryStore<'a>,
}

impl<'a> SourceCatalog<'a> {
    pub fn new(config: CatalogConfig, registries: &'a RegistryStore<'a>) -> Self {
        Self { config, registries }
    }

    /// Directory layers in precedence order.
    fn directory_layers(&self) -> Vec<(&Path, fn(PathBuf) -> ResolutionOrigin)> {
        let mut layers: Vec<(&Path, fn(PathBuf) -> ResolutionOrigin)> = Vec::new();
        if let Some(dir) = &self.config.custom_dir {
            layers.push((dir.as_path(), ResolutionOrigin::CustomPath));
        }
        layers.push((self.config.user_dir.as_path(), ResolutionOrigin::UserCache));
        if let Some(dir) = &self.config.bundled_dir {
            layers.push((dir.as_path(), ResolutionOrigin::Bundled));
        }
        layers
    }

    /// Every source name visible from any layer.
    ///
    /// Creates the default registry on first run, but only reads payloads
    /// that are already cached; it never fetches.
    pub fn list_available(&self) -> Result<BTreeSet<String>, CatalogError> {
        self.registries.ensure_default()?;

        let mut names = BTreeSet::new();
        for (dir, _) in self.directory_layers() {
            names.extend(list_directory(dir));
        }

        names.extend(self.merged_registries()?.sources.into_keys());

        Ok(names)
    }

    /// Resolves `name` to a declaration and the layer it came from.
    pub fn resolve(&self, name: &str) -> Result<ResolvedSource, CatalogError> {
        let literal = Path::new(name);
        if literal.is_file() {
            match read_declaration_file(literal) {
                Ok(declaration) => {
                    return Ok(ResolvedSource {
                        declaration,
                        origin: ResolutionOrigin::LocalPath(literal.to_path_buf()),
                    })
                }
                Err(e) => warn!(path = %literal.display(), error = %e, "Skipping declaration file"),
            }
        }

        if is_plain_name(name) {
            for (dir, origin) in self.directory_layers() {
                let Some(path) = find_in_directory(dir, name) else {
                    continue;
                };
                match read_declaration_file(&path) {
                    Ok(declaration) => {
                        debug!(source = %name, path = %path.display(), "Resolved from directory");
                        return Ok(ResolvedSource {
                            declaration,
                            origin: origin(path),
                        });
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping declaration file"),
                }
            }
        }

        let merged = self.merged_registries()?;
        if let Some(entry) = merged.sources.get(name) {
            match parse_declaration(name, &entry.body) {
                Ok(declaration) => {
                    debug!(source = %name, registry = %entry.registry, "Resolved from registry");
                    return Ok(ResolvedSource {
                        declaration,
                        origin: ResolutionOrigin::Registry(entry.registry.clone()),
                    });
                }
                Err(e) => warn!(
                    source = %name,
                    registry = %entry.registry,
                    error = %e,
                    "Skipping malformed registry source"
                ),
            }
        }

        Err(CatalogError::NotFound(name.to_string()))
    }

    /// Cached registry layers folded in stored order.
    ///
    /// Entries that do not parse are dropped before the fold, so a malformed
    /// entry never shadows a usable one from an earlier registry.
    fn merged_registries(&self) -> Result<MergedSources, CatalogError> {
        let mut layers = self.registries.load_layers()?;
        for layer in &mut layers {
            layer.sources.retain(|source, body| match parse_declaration(source, body) {
                Ok(_) => true,
                Err(e) => {
                    warn!(
                        source = %source,
                        registry = %layer.registry,
                        error = %e,
                        "Skipping malformed registry source"
                    );
                    false
                }
            });
        }
        Ok(merge_layers(&layers))
    }
}

/// Names without separators are the only ones looked up inside directories.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// `<dir>/<name>.yaml`, `<dir>/<name>.yml`, then `<dir>/<name>`.
fn find_in_directory(dir: &Path, name: &str) -> Option<PathBuf> {
    DECLARATION_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .chain(std::iter::once(dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Stems of all declaration files directly inside `dir`.
fn list_directory(dir: &Path) -> Vec<String> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut names = Vec::new();

    for ext in DECLARATION_EXTENSIONS {
        let pattern = format!("{}/*.{}", escaped, ext);
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid source directory pattern");
                continue;
            }
        };
        for path in entries.flatten() {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
    }

    names
}
