//! Free-space lookup for mounted volumes.

use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::debug;

use super::types::SpaceProbe;

/// Uses the disk whose mount point is the longest prefix of the path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpaceProbe;

impl SystemSpaceProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SpaceProbe for SystemSpaceProbe {
    fn available_space(&self, path: &Path) -> Option<u64> {
        let target = nearest_existing(path)?;
        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(PathBuf, u64)> = disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point().to_path_buf(), disk.available_space()))
            .collect();

        let space = best_mount(&target, &mounts);
        debug!(path = %target.display(), available = ?space, "Checked free space");
        space
    }
}

/// Canonical form of the closest ancestor of `path` that exists.
fn nearest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|ancestor| ancestor.exists())
        .and_then(|ancestor| ancestor.canonicalize().ok())
}

fn best_mount(target: &Path, mounts: &[(PathBuf, u64)]) -> Option<u64> {
    mounts
        .iter()
        .filter(|(mount, _)| target.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| *available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_mount_wins() {
        let mounts = vec![
            (PathBuf::from("/"), 10),
            (PathBuf::from("/data"), 20),
            (PathBuf::from("/data/models"), 30),
        ];
        assert_eq!(best_mount(Path::new("/data/models/sd/a"), &mounts), Some(30));
        assert_eq!(best_mount(Path::new("/data/other"), &mounts), Some(20));
        assert_eq!(best_mount(Path::new("/home"), &mounts), Some(10));
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let mounts = vec![(PathBuf::from("/"), 10), (PathBuf::from("/data"), 20)];
        assert_eq!(best_mount(Path::new("/database"), &mounts), Some(10));
    }

    #[test]
    fn test_no_matching_mount() {
        let mounts = vec![(PathBuf::from("/data"), 20)];
        assert_eq!(best_mount(Path::new("/home"), &mounts), None);
    }

    #[test]
    fn test_nearest_existing_walks_up() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("a/b/c.bin");
        assert_eq!(
            nearest_existing(&missing),
            Some(tmp.path().canonicalize().unwrap())
        );
    }
}
