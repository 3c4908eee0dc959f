//! Compares a declaration against what exists under a root.

use futures::stream::{self, StreamExt};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::sources::{FileItem, SourceDeclaration};
use crate::transfer::{SizeProbe, MAX_CONCURRENT_PROBES};

use super::status::{ItemStatus, SourceStatus};

/// Builds [`SourceStatus`] values. Read-only apart from optional size probes.
#[derive(Clone)]
pub struct Reconciler {
    probe: Arc<dyn SizeProbe>,
}

impl Reconciler {
    pub fn new(probe: Arc<dyn SizeProbe>) -> Self {
        Self { probe }
    }

    /// Filesystem-only status. Remote sizes come from declared size hints.
    pub fn reconcile_local(declaration: &SourceDeclaration, root: &Path) -> SourceStatus {
        let items = declaration
            .items
            .iter()
            .map(|item| stat_item(item, root))
            .collect();
        SourceStatus::from_items(&declaration.name, items)
    }

    /// Status of every item, probing remote sizes of missing items when asked.
    ///
    /// Probes run concurrently, bounded by [`MAX_CONCURRENT_PROBES`]. A failed
    /// probe leaves that item's remote size unknown and affects nothing else.
    pub async fn reconcile(
        &self,
        declaration: &SourceDeclaration,
        root: &Path,
        probe_remote: bool,
    ) -> SourceStatus {
        let local = Self::reconcile_local(declaration, root);
        if !probe_remote {
            return local;
        }

        let probe = &self.probe;
        let items: Vec<ItemStatus> = stream::iter(local.items)
            .map(|mut status| async move {
                if status.is_installed {
                    return status;
                }
                match probe.remote_size(&status.url).await {
                    Ok(Some(size)) => status.remote_size = Some(size),
                    Ok(None) => debug!(url = %status.url, "Remote size unknown"),
                    Err(e) => warn!(url = %status.url, error = %e, "Size probe failed"),
                }
                status
            })
            .buffered(MAX_CONCURRENT_PROBES)
            .collect()
            .await;

        SourceStatus::from_items(local.name, items)
    }
}

fn stat_item(item: &FileItem, root: &Path) -> ItemStatus {
    let path = item.target_path(root);
    let (is_installed, local_size) = match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => (true, Some(meta.len())),
        _ => (false, None),
    };

    ItemStatus {
        url: item.url.clone(),
        dest: item.dest.clone(),
        path,
        is_installed,
        local_size,
        remote_size: item.size_hint,
    }
}
