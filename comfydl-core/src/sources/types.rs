//! Core source type definitions.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::dest::normalize_dest;

/// Errors in a declaration body or a single file entry.
///
/// These never abort a batch: the offending unit is skipped with a warning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("Failed to parse declaration: {0}")]
    Parse(String),
    #[error("Unsupported declaration shape: expected a list of entries or an object with 'downloads'")]
    InvalidShape,
    #[error("Entry is missing '{field}'")]
    MissingField { field: &'static str },
    #[error("Destination '{dest}' is not a relative path inside the root")]
    UnsafeDestination { dest: String },
}

/// Errors raised while resolving a source name.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Model source '{0}' not found")]
    NotFound(String),
    #[error("Registry error: {0}")]
    Registry(#[from] crate::registry::RegistryError),
}

/// A single file to fetch: where from, and where to put it under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    /// Download URL.
    pub url: String,
    /// Normalized destination, relative to the installation root.
    pub dest: PathBuf,
    /// Size declared by the publisher, when one is known up front.
    pub size_hint: Option<u64>,
}

impl FileItem {
    /// Creates an item, rejecting destinations that would escape the root.
    pub fn new(url: impl Into<String>, dest: &str) -> Result<Self, DeclarationError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(DeclarationError::MissingField { field: "url" });
        }
        Ok(Self {
            url,
            dest: normalize_dest(dest)?,
            size_hint: None,
        })
    }

    /// Attaches a publisher-declared size.
    pub fn with_size_hint(mut self, size: Option<u64>) -> Self {
        self.size_hint = size;
        self
    }

    /// Absolute path of this item under `root`.
    pub fn target_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dest)
    }

    /// Display form of the destination, always with forward slashes.
    pub fn dest_display(&self) -> String {
        self.dest
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The normalized form of a model source, whatever format it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDeclaration {
    /// Source name (file stem or registry key).
    pub name: String,
    /// Items in declaration order.
    pub items: Vec<FileItem>,
    /// Entries that were dropped while normalizing, one message each.
    pub warnings: Vec<String>,
}

impl SourceDeclaration {
    /// Creates a declaration with no dropped entries.
    pub fn new(name: impl Into<String>, items: Vec<FileItem>) -> Self {
        Self {
            name: name.into(),
            items,
            warnings: Vec::new(),
        }
    }

    /// True when there is nothing to fetch.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The provider layer a declaration was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOrigin {
    /// A literal filesystem path given in place of a name.
    LocalPath(PathBuf),
    /// The configured custom source directory.
    CustomPath(PathBuf),
    /// The user-level override directory (`~/.comfydl/model_sources`).
    UserCache(PathBuf),
    /// The bundled/working-directory source folder.
    Bundled(PathBuf),
    /// A cached registry payload, by registry name.
    Registry(String),
}

impl ResolutionOrigin {
    /// File the declaration was read from, for directory-backed layers.
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::LocalPath(p) | Self::CustomPath(p) | Self::UserCache(p) | Self::Bundled(p) => {
                Some(p)
            }
            Self::Registry(_) => None,
        }
    }
}

impl fmt::Display for ResolutionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPath(_) => write!(f, "local-path"),
            Self::CustomPath(_) => write!(f, "custom-path"),
            Self::UserCache(_) => write!(f, "user-cache"),
            Self::Bundled(_) => write!(f, "bundled"),
            Self::Registry(name) => write!(f, "registry:{}", name),
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub declaration: SourceDeclaration,
    pub origin: ResolutionOrigin,
}
