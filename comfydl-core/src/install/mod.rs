//! Installation state and the download/removal planners.
//!
//! [`Reconciler`] compares a declaration against a target root and never
//! fails. [`DownloadPlanner`] and [`RemovalPlanner`] build a plan from that
//! status and execute it item by item behind a [`ConfirmPolicy`] gate.

mod confirm;
mod download;
mod error;
mod reconcile;
mod removal;
mod render;
mod status;

pub use confirm::ConfirmPolicy;
pub use download::{DownloadPlan, DownloadPlanner, ExecutionResult, ItemOutcome, ItemResult};
pub use error::PlanError;
pub use reconcile::Reconciler;
pub use removal::{
    RemovalItemResult, RemovalOutcome, RemovalPlan, RemovalPlanner, RemovalResult, SkippedPath,
    StagedFile,
};
pub use render::{render_status, status_marker};
pub use status::{InstallState, ItemStatus, SourceStatus};

use std::path::Path;

/// Checks the target root once, before any per-item work.
pub fn ensure_root(root: &Path) -> Result<(), PlanError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(PlanError::RootNotFound(root.to_path_buf()))
    }
}
