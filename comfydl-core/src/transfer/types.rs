//! Collaborator traits used by the install planners.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from a single file transfer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Failed to prepare {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with {}", code.map(|c| format!("status {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    Failed { program: String, code: Option<i32> },
}

/// Errors from a remote size lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Size request failed: {0}")]
    Request(String),

    #[error("Size request returned HTTP {0}")]
    Status(u16),
}

/// What a successful transfer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Bytes were fetched and the destination now exists.
    Downloaded,
    /// The destination already existed and nothing was fetched.
    AlreadyPresent,
}

/// Looks up the size of a remote file without fetching it.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    /// `Ok(None)` when the server does not report a size.
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, ProbeError>;
}

/// Fetches one URL to one local path.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn transfer(&self, url: &str, dest: &Path) -> Result<TransferOutcome, TransferError>;
}

/// Reports free bytes on the volume holding a path.
pub trait SpaceProbe: Send + Sync {
    /// `None` when the volume cannot be determined.
    fn available_space(&self, path: &Path) -> Option<u64>;
}
