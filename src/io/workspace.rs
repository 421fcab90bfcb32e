//! Workspace abstraction for agent file operations.
//!
//! The [`Workspace`] trait decouples the loop from the filesystem. Paths are
//! always workspace-root-relative with forward slashes; the path safety
//! rules in [`crate::core::path`] run before any call lands here, and
//! [`LocalWorkspace`] re-checks containment as defense in depth.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Directory names excluded from project file listings.
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "coverage", "target", "out"];

/// Abstraction over the agent's working file tree.
pub trait Workspace {
    /// Absolute root directory of the workspace.
    fn root_dir(&self) -> &Path;

    /// Replace the full contents of a workspace-relative file, creating
    /// parent directories as needed.
    fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Sorted, workspace-relative paths of tracked project files.
    fn list_project_files(&self) -> Result<Vec<String>>;
}

/// Workspace backed by a real directory tree.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn visit(&self, dir: &Path, prefix: &str, files: &mut Vec<String>) -> Result<()> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                continue;
            }
            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry
                .file_type()
                .with_context(|| format!("stat {}", entry.path().display()))?;
            if file_type.is_dir() {
                self.visit(&entry.path(), &relative, files)?;
            } else if file_type.is_file() {
                files.push(relative);
            }
        }
        Ok(())
    }
}

impl Workspace for LocalWorkspace {
    fn root_dir(&self) -> &Path {
        &self.root
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        // Containment re-check: the core validator runs first, but the
        // workspace must not escape its root even if called directly.
        if path.is_empty()
            || path.starts_with('/')
            || path.split('/').any(|segment| segment == "..")
        {
            return Err(anyhow!("refusing to write outside workspace: {path}"));
        }

        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&target, content).with_context(|| format!("write {}", target.display()))?;
        debug!(path, bytes = content.len(), "wrote workspace file");
        Ok(())
    }

    fn list_project_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        self.visit(&self.root, "", &mut files)?;
        files.sort();
        Ok(files)
    }
}
