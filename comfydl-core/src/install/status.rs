//! Derived installation status. Never persisted.

use std::path::PathBuf;

/// Status of one declared file under the target root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStatus {
    pub url: String,
    /// Declared destination, relative to the root.
    pub dest: PathBuf,
    /// `root/dest`.
    pub path: PathBuf,
    pub is_installed: bool,
    /// On-disk size; only set when installed.
    pub local_size: Option<u64>,
    /// Probed or declared size of the remote file.
    pub remote_size: Option<u64>,
}

impl ItemStatus {
    /// The size worth showing: on-disk when installed, remote otherwise.
    pub fn display_size(&self) -> Option<u64> {
        if self.is_installed {
            self.local_size
        } else {
            self.remote_size
        }
    }

    pub fn dest_display(&self) -> String {
        self.dest.to_string_lossy().replace('\\', "/")
    }
}

/// Aggregate state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Installed,
    Partial,
    Missing,
}

/// Per-item statuses plus their aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub items: Vec<ItemStatus>,
    pub installed_count: usize,
    pub total_count: usize,
    /// Sum of `local_size` over installed items.
    pub total_local_size: u64,
}

impl SourceStatus {
    pub fn from_items(name: impl Into<String>, items: Vec<ItemStatus>) -> Self {
        let installed: Vec<&ItemStatus> = items.iter().filter(|i| i.is_installed).collect();
        let installed_count = installed.len();
        let total_local_size = installed
            .iter()
            .filter_map(|i| i.local_size)
            .fold(0u64, u64::saturating_add);
        let total_count = items.len();

        Self {
            name: name.into(),
            items,
            installed_count,
            total_count,
            total_local_size,
        }
    }

    /// An empty source counts as installed.
    pub fn state(&self) -> InstallState {
        if self.installed_count == self.total_count {
            InstallState::Installed
        } else if self.installed_count == 0 {
            InstallState::Missing
        } else {
            InstallState::Partial
        }
    }

    pub fn is_fully_installed(&self) -> bool {
        self.state() == InstallState::Installed
    }
}
