//! Removal planning and best-effort deletion.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::format::format_bytes;
use crate::sources::SourceDeclaration;

use super::confirm::ConfirmPolicy;
use super::ensure_root;
use super::error::PlanError;

/// An existing regular file queued for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub dest: PathBuf,
    pub path: PathBuf,
    pub size: u64,
}

/// A declared path that exists but will not be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPath {
    pub dest: PathBuf,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalPlan {
    pub source: String,
    pub root: PathBuf,
    pub staged: Vec<StagedFile>,
    pub skipped: Vec<SkippedPath>,
    pub total_size: u64,
}

impl RemovalPlan {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn confirmation_prompt(&self) -> String {
        let noun = if self.staged.len() == 1 { "file" } else { "files" };
        format!(
            "Delete {} {} ({})?",
            self.staged.len(),
            noun,
            format_bytes(self.total_size)
        )
    }
}

/// Per-file result of a removal run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalItemResult {
    Deleted,
    Failed(String),
    /// Skipped because the run was interrupted first.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub path: PathBuf,
    pub size: u64,
    pub result: RemovalItemResult,
}

impl RemovalOutcome {
    pub fn is_deleted(&self) -> bool {
        self.result == RemovalItemResult::Deleted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalResult {
    /// Report only; nothing was deleted.
    DryRun { files: usize, total_size: u64 },
    NothingToDo,
    Aborted,
    Completed(Vec<RemovalOutcome>),
}

impl RemovalResult {
    pub fn freed_bytes(&self) -> u64 {
        match self {
            RemovalResult::Completed(outcomes) => outcomes
                .iter()
                .filter(|o| o.is_deleted())
                .map(|o| o.size)
                .fold(0u64, u64::saturating_add),
            _ => 0,
        }
    }

    pub fn was_interrupted(&self) -> bool {
        match self {
            RemovalResult::Completed(outcomes) => outcomes
                .iter()
                .any(|o| o.result == RemovalItemResult::NotAttempted),
            _ => false,
        }
    }
}

/// Stages and deletes the files a declaration owns under a root.
#[derive(Debug)]
pub struct RemovalPlanner {
    cancel: Arc<AtomicBool>,
}

impl Default for RemovalPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RemovalPlanner {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn plan(&self, declaration: &SourceDeclaration, root: &Path) -> Result<RemovalPlan, PlanError> {
        ensure_root(root)?;

        let mut staged = Vec::new();
        let mut skipped = Vec::new();

        for item in &declaration.items {
            let path = item.target_path(root);
            let Ok(meta) = fs::symlink_metadata(&path) else {
                continue;
            };

            if meta.is_file() {
                staged.push(StagedFile {
                    dest: item.dest.clone(),
                    path,
                    size: meta.len(),
                });
            } else {
                let reason = if meta.is_dir() {
                    "is a directory"
                } else {
                    "is not a regular file"
                };
                warn!(path = %path.display(), reason, "Skipping removal");
                skipped.push(SkippedPath {
                    dest: item.dest.clone(),
                    path,
                    reason: reason.to_string(),
                });
            }
        }

        let total_size = staged.iter().map(|f| f.size).fold(0u64, u64::saturating_add);

        Ok(RemovalPlan {
            source: declaration.name.clone(),
            root: root.to_path_buf(),
            staged,
            skipped,
            total_size,
        })
    }

    pub fn execute(&self, plan: &RemovalPlan, policy: &ConfirmPolicy, dry_run: bool) -> RemovalResult {
        if dry_run {
            return RemovalResult::DryRun {
                files: plan.staged.len(),
                total_size: plan.total_size,
            };
        }

        if plan.is_empty() {
            info!(source = %plan.source, "Nothing to remove");
            return RemovalResult::NothingToDo;
        }

        if !policy.confirm(&plan.confirmation_prompt()) {
            info!(source = %plan.source, "Removal declined");
            return RemovalResult::Aborted;
        }

        let mut outcomes = Vec::with_capacity(plan.staged.len());
        for file in &plan.staged {
            let result = if self.cancel.load(Ordering::SeqCst) {
                RemovalItemResult::NotAttempted
            } else {
                match fs::remove_file(&file.path) {
                    Ok(()) => {
                        info!(path = %file.path.display(), "Deleted");
                        RemovalItemResult::Deleted
                    }
                    Err(e) => {
                        warn!(path = %file.path.display(), error = %e, "Failed to delete");
                        RemovalItemResult::Failed(e.to_string())
                    }
                }
            };
            outcomes.push(RemovalOutcome {
                path: file.path.clone(),
                size: file.size,
                result,
            });
        }

        if self.cancel.load(Ordering::SeqCst) {
            warn!(source = %plan.source, "Removal interrupted");
        }

        RemovalResult::Completed(outcomes)
    }
}
