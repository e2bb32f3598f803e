//! Scoped backup of the previous production requirement list
//!
//! The backup file exists only while a `BackupGuard` is alive. It is removed
//! when the guard drops: on success, on an early return after a fatal step,
//! on panic unwinding, and when the pipeline future is cancelled.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Owns the backup artifact for the duration of one run
#[derive(Debug)]
pub struct BackupGuard {
    path: PathBuf,
}

impl BackupGuard {
    /// Copy `source` to `backup` if `source` exists.
    ///
    /// A stale backup left by a killed run is removed first, so the returned
    /// guard always refers to a copy made by this run.
    pub fn create(source: &Path, backup: &Path) -> io::Result<Option<Self>> {
        remove_if_present(backup)?;

        if !source.is_file() {
            return Ok(None);
        }

        // Guard first so a partially written copy is still cleaned up
        let guard = Self {
            path: backup.to_path_buf(),
        };
        fs::copy(source, backup)?;
        Ok(Some(guard))
    }

    /// Location of the backup file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Contents of the backup
    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        let _ = remove_if_present(&self.path);
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_no_source_no_backup() {
        let dir = tempdir().unwrap();
        let guard = BackupGuard::create(
            &dir.path().join("requirements.txt"),
            &dir.path().join("requirements.txt.backup"),
        )
        .unwrap();
        assert!(guard.is_none());
        assert!(!dir.path().join("requirements.txt.backup").exists());
    }

    #[test]
    fn test_backup_copied_and_removed_on_drop() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("requirements.txt");
        let backup = dir.path().join("requirements.txt.backup");
        fs::write(&source, "pkgA==1.0.0\n").unwrap();

        let guard = BackupGuard::create(&source, &backup).unwrap().unwrap();
        assert_eq!(guard.path(), backup.as_path());
        assert_eq!(guard.read().unwrap(), b"pkgA==1.0.0\n");

        // Overwriting the source does not affect the backup
        fs::write(&source, "pkgA==1.1.0\n").unwrap();
        assert_eq!(guard.read().unwrap(), b"pkgA==1.0.0\n");

        drop(guard);
        assert!(!backup.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_backup_removed_on_early_return() {
        fn fails_midway(source: &Path, backup: &Path) -> Result<(), String> {
            let _guard = BackupGuard::create(source, backup).map_err(|e| e.to_string())?;
            Err("export failed".to_string())
        }

        let dir = tempdir().unwrap();
        let source = dir.path().join("requirements.txt");
        let backup = dir.path().join("requirements.txt.backup");
        fs::write(&source, "a==1\n").unwrap();

        assert!(fails_midway(&source, &backup).is_err());
        assert!(!backup.exists());
    }

    #[test]
    fn test_stale_backup_removed() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("requirements.txt");
        let backup = dir.path().join("requirements.txt.backup");
        fs::write(&backup, "stale\n").unwrap();

        let guard = BackupGuard::create(&source, &backup).unwrap();
        assert!(guard.is_none());
        assert!(!backup.exists());
    }
}
