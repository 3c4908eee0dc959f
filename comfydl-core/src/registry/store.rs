//! Registry endpoint storage and payload cache.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::paths::AppPaths;

use super::client::RegistryClient;
use super::payload::{sources_from_payload, RegistryLayer};
use super::types::{validate_registry_name, RegistryEndpoint, RegistryError};

/// URL of the registry created on first run.
pub const DEFAULT_REGISTRY_URL: &str = "https://shinchven.github.io/comfydl-sources/sources.json";

/// Name of the registry created on first run.
pub const DEFAULT_REGISTRY_NAME: &str = "default";

/// Outcome of a registry update, one entry per registry attempted.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    pub failed: Vec<(String, RegistryError)>,
}

impl UpdateReport {
    /// True when every attempted registry was refreshed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry endpoints in the database plus their payload cache on disk.
pub struct RegistryStore<'a> {
    db: &'a Database,
    cache_dir: PathBuf,
}

impl<'a> RegistryStore<'a> {
    /// Creates a store caching payloads under `paths.registries_dir()`.
    pub fn new(db: &'a Database, paths: &AppPaths) -> Self {
        Self::with_cache_dir(db, paths.registries_dir())
    }

    /// Creates a store with an explicit cache directory.
    pub fn with_cache_dir(db: &'a Database, cache_dir: PathBuf) -> Self {
        Self { db, cache_dir }
    }

    /// Cache file for a registry.
    pub fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// All endpoints, in the order they were first added.
    pub fn list(&self) -> Result<Vec<RegistryEndpoint>, RegistryError> {
        let mut stmt = self
            .db
            .conn()
            .prepare("SELECT name, url, fetched_at FROM registries ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            let fetched_at: Option<i64> = row.get(2)?;
            Ok(RegistryEndpoint {
                name: row.get(0)?,
                url: row.get(1)?,
                fetched_at: fetched_at.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Looks up one endpoint.
    pub fn get(&self, name: &str) -> Result<Option<RegistryEndpoint>, RegistryError> {
        Ok(self.list()?.into_iter().find(|r| r.name == name))
    }

    /// Adds an endpoint, or replaces the URL of an existing one in place.
    pub fn add(&self, name: &str, url: &str) -> Result<(), RegistryError> {
        validate_registry_name(name)?;
        self.db.conn().execute(
            "INSERT INTO registries (name, url, updated_at) VALUES (?, ?, unixepoch())
             ON CONFLICT(name) DO UPDATE SET url = excluded.url, updated_at = excluded.updated_at",
            params![name, url],
        )?;
        info!(registry = %name, url = %url, "Registry saved");
        Ok(())
    }

    /// Removes an endpoint and its cached payload.
    ///
    /// Returns `false` if no such registry was configured.
    pub fn remove(&self, name: &str) -> Result<bool, RegistryError> {
        let removed = self
            .db
            .conn()
            .execute("DELETE FROM registries WHERE name = ?", [name])?
            > 0;

        if removed && validate_registry_name(name).is_ok() {
            let path = self.cache_path(name);
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove registry cache");
                }
            }
        }

        Ok(removed)
    }

    /// Creates the default registry when none are configured.
    ///
    /// Returns `true` if it was created.
    pub fn ensure_default(&self) -> Result<bool, RegistryError> {
        if self.count()? > 0 {
            return Ok(false);
        }

        debug!("No registries configured, adding default");
        self.add(DEFAULT_REGISTRY_NAME, DEFAULT_REGISTRY_URL)?;
        Ok(true)
    }

    // =========================================================================
    // Payload Cache
    // =========================================================================

    /// Reads a cached payload; `None` if it was never fetched.
    pub fn read_payload(&self, name: &str) -> Result<Option<Value>, RegistryError> {
        validate_registry_name(name)?;
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RegistryError::Malformed {
                registry: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Writes a payload to the cache and records the fetch time.
    pub fn write_payload(&self, name: &str, payload: &Value) -> Result<(), RegistryError> {
        validate_registry_name(name)?;
        fs::create_dir_all(&self.cache_dir).map_err(|e| RegistryError::Io {
            path: self.cache_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let path = self.cache_path(name);
        let text = serde_json::to_string_pretty(payload).map_err(|e| RegistryError::Malformed {
            registry: name.to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, text).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.db.conn().execute(
            "UPDATE registries SET fetched_at = unixepoch() WHERE name = ?",
            [name],
        )?;
        Ok(())
    }

    /// Cached source mappings of every configured registry, in stored order.
    ///
    /// Registries never fetched are skipped silently; unreadable or malformed
    /// payloads are skipped with a warning.
    pub fn load_layers(&self) -> Result<Vec<RegistryLayer>, RegistryError> {
        let mut layers = Vec::new();

        for endpoint in self.list()? {
            let payload = match self.read_payload(&endpoint.name) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    warn!(registry = %endpoint.name, error = %e, "Failed to load registry");
                    continue;
                }
            };

            match sources_from_payload(&endpoint.name, &payload) {
                Ok(sources) => layers.push(RegistryLayer {
                    registry: endpoint.name,
                    sources,
                }),
                Err(e) => warn!(registry = %endpoint.name, error = %e, "Skipping registry"),
            }
        }

        Ok(layers)
    }

    /// Re-fetches one registry, or all of them when `name` is `None`.
    ///
    /// A failing registry is recorded and the rest are still updated.
    pub async fn update(
        &self,
        client: &dyn RegistryClient,
        name: Option<&str>,
    ) -> Result<UpdateReport, RegistryError> {
        self.ensure_default()?;

        let targets = match name {
            Some(name) => vec![self
                .get(name)?
                .ok_or_else(|| RegistryError::NotConfigured(name.to_string()))?],
            None => self.list()?,
        };

        let mut report = UpdateReport::default();
        for endpoint in targets {
            info!(registry = %endpoint.name, url = %endpoint.url, "Updating registry");
            let result = match client.fetch(&endpoint.url).await {
                Ok(payload) => self.write_payload(&endpoint.name, &payload),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.updated.push(endpoint.name),
                Err(e) => {
                    warn!(registry = %endpoint.name, error = %e, "Registry update failed");
                    report.failed.push((endpoint.name, e));
                }
            }
        }

        Ok(report)
    }

    /// Number of configured registries.
    pub fn count(&self) -> Result<usize, RegistryError> {
        let count: i64 = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM registries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
