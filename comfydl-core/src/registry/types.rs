//! Registry type definitions.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the registry store and client.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Invalid registry name '{0}': must be a plain file name")]
    InvalidName(String),
    #[error("Registry '{0}' not configured")]
    NotConfigured(String),
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("Invalid registry format for '{registry}': {reason}")]
    Malformed { registry: String, reason: String },
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// A configured registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    /// Unique name; also the cache file stem.
    pub name: String,
    /// URL of the registry JSON.
    pub url: String,
    /// When the cached payload was last written by an update.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Checks that `name` can be used as a cache file stem.
pub fn validate_registry_name(name: &str) -> Result<(), RegistryError> {
    let invalid = name.trim().is_empty()
        || name != name.trim()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        Err(RegistryError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
