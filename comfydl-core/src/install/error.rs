use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop a whole plan before any item is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Target root '{}' does not exist", .0.display())]
    RootNotFound(PathBuf),

    #[error("Neither aria2c nor wget found. Please install one of them.")]
    NoDownloader,
}
