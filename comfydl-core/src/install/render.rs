//! Text rendering of installation status.

use crate::format::format_bytes;

use super::status::{InstallState, ItemStatus, SourceStatus};

pub fn status_marker(state: InstallState) -> &'static str {
    match state {
        InstallState::Installed => "✓",
        InstallState::Partial => "◐",
        InstallState::Missing => "✗",
    }
}

fn item_marker(item: &ItemStatus) -> &'static str {
    status_marker(if item.is_installed {
        InstallState::Installed
    } else {
        InstallState::Missing
    })
}

fn size_suffix(size: Option<u64>) -> String {
    size.map(|s| format!(" ({})", format_bytes(s)))
        .unwrap_or_default()
}

/// Renders a source as one line when it has a single item, or as a tree.
///
/// ```text
/// ◐ flux  1/2 installed (11.1 GB)
/// ├── ✓ models/unet/flux1-dev.safetensors (11.1 GB)
/// └── ✗ models/vae/ae.safetensors (319.8 MB)
/// ```
pub fn render_status(status: &SourceStatus) -> String {
    let marker = status_marker(status.state());

    if let [item] = status.items.as_slice() {
        return format!(
            "{} {}  {}{}",
            marker,
            status.name,
            item.dest_display(),
            size_suffix(item.display_size())
        );
    }

    let total = (status.total_local_size > 0).then_some(status.total_local_size);
    let mut lines = vec![format!(
        "{} {}  {}/{} installed{}",
        marker,
        status.name,
        status.installed_count,
        status.total_count,
        size_suffix(total)
    )];

    let last = status.items.len().saturating_sub(1);
    for (i, item) in status.items.iter().enumerate() {
        let branch = if i == last { "└──" } else { "├──" };
        lines.push(format!(
            "{} {} {}{}",
            branch,
            item_marker(item),
            item.dest_display(),
            size_suffix(item.display_size())
        ));
    }

    lines.join("\n")
}
