//! Destination path normalization.
//!
//! A declared `dest` is joined onto a caller-supplied root, so it must stay a
//! plain relative path: no root, no drive prefix, and no `..` that climbs
//! above the root. `.` segments and empty segments are dropped; `..` that
//! stays inside the root is folded.

use std::path::{Component, Path, PathBuf};

use super::types::DeclarationError;

/// Normalizes `dest` to a relative path that cannot escape its root.
pub fn normalize_dest(dest: &str) -> Result<PathBuf, DeclarationError> {
    let unsafe_dest = || DeclarationError::UnsafeDestination {
        dest: dest.to_string(),
    };

    let trimmed = dest.trim();
    if trimmed.is_empty() {
        return Err(DeclarationError::MissingField { field: "dest" });
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(unsafe_dest());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(unsafe_dest()),
        }
    }

    if parts.is_empty() {
        return Err(unsafe_dest());
    }

    Ok(parts.into_iter().collect())
}
