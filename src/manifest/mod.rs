//! Manifest (pyproject.toml) and lockfile access
//!
//! The manifest is read-only to every operation in this crate; it is only
//! modified by the resolver (`uv add` / `uv remove`).

mod pyproject;

pub use pyproject::{Manifest, MANIFEST_FILENAME, TOOL_TABLE};

use std::path::{Path, PathBuf};

/// Lockfile produced by the resolver
pub const LOCKFILE_FILENAME: &str = "uv.lock";

/// Path of the manifest under a project root
pub fn manifest_path(project_root: &Path) -> PathBuf {
    project_root.join(MANIFEST_FILENAME)
}

/// Path of the lockfile under a project root
pub fn lockfile_path(project_root: &Path) -> PathBuf {
    project_root.join(LOCKFILE_FILENAME)
}

/// Returns true if the project root has a lockfile
pub fn has_lockfile(project_root: &Path) -> bool {
    lockfile_path(project_root).is_file()
}
