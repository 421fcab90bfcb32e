//! Path safety rules for `update_file` targets.

use anyhow::{Result, anyhow};

/// Validate a workspace-relative file path and normalize separators.
///
/// Rules, checked in order: the path must be non-empty, must not contain a
/// parent-directory (`..`) segment, and must not be absolute. Backslash
/// separators are normalized to forward slashes in the returned path.
///
/// This runs purely on the string, before the workspace collaborator is ever
/// invoked, so a rejected path never reaches storage.
pub fn sanitize_path(path: &str) -> Result<String> {
    if path.is_empty() {
        return Err(anyhow!("update_file action requires a path."));
    }
    if has_parent_segment(path) {
        return Err(anyhow!("Path {path} is not allowed."));
    }
    if path.starts_with('/') {
        return Err(anyhow!("Path {path} must be relative."));
    }
    Ok(path.replace('\\', "/"))
}

fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}
