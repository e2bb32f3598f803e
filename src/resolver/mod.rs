//! External tool integration
//!
//! This module provides:
//! - `Resolver`: lock, export, tree, add/remove/upgrade and conflict check
//! - `Provisioner`: disposable environments for dry-run installs
//! - `RuntimeManager`: language runtime installation and exec wrapper
//! - Process-backed implementations for `uv` and `mise`

mod mise;
mod process;
mod uv;

pub use mise::MiseRuntime;
pub use process::{locate, ToolCommand, ToolOutput};
pub use uv::UvResolver;

use crate::error::ResolverError;
use async_trait::async_trait;
use std::path::Path;
use tempfile::TempDir;

/// Which dependency groups an export includes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    /// Everything except the named development group
    Production { dev_group: String },
    /// Only the named group
    Group(String),
}

/// A throwaway environment; its directory is removed on drop
#[derive(Debug)]
pub struct DisposableEnv {
    dir: TempDir,
}

impl DisposableEnv {
    /// Wrap a temporary directory
    pub fn new(dir: TempDir) -> Self {
        Self { dir }
    }

    /// Location of the environment
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the environment, reporting failures
    pub fn close(self) -> Result<(), ResolverError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| ResolverError::Environment { path, source })
    }
}

/// Manifest/lockfile resolver
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Tool name for messages
    fn name(&self) -> &str;

    /// Binary other tools should invoke to reach this resolver
    fn program(&self) -> &Path {
        Path::new(self.name())
    }

    /// Generate the lockfile
    async fn lock(&self, root: &Path) -> Result<ToolOutput, ResolverError>;

    /// Export the locked dependencies as requirements text
    async fn export(&self, root: &Path, scope: &ExportScope) -> Result<String, ResolverError>;

    /// Render the full dependency graph
    async fn tree(&self, root: &Path) -> Result<String, ResolverError>;

    /// Add a dependency, optionally to a group
    async fn add(
        &self,
        root: &Path,
        package: &str,
        group: Option<&str>,
    ) -> Result<ToolOutput, ResolverError>;

    /// Remove a dependency
    async fn remove(&self, root: &Path, package: &str) -> Result<ToolOutput, ResolverError>;

    /// Upgrade one package, or every package when `None`
    async fn upgrade(
        &self,
        root: &Path,
        package: Option<&str>,
    ) -> Result<ToolOutput, ResolverError>;

    /// Create or refresh the project environment from the lockfile
    async fn sync_environment(&self, root: &Path) -> Result<ToolOutput, ResolverError>;

    /// Check the installed environment for conflicts
    async fn check(&self, root: &Path) -> Result<ToolOutput, ResolverError>;
}

/// Disposable environment provisioner
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create a fresh environment
    async fn create(&self, root: &Path) -> Result<DisposableEnv, ResolverError>;

    /// Install a requirements file into the environment
    async fn install(
        &self,
        root: &Path,
        env: &DisposableEnv,
        requirements: &Path,
        dry_run: bool,
    ) -> Result<ToolOutput, ResolverError>;

    /// Destroy the environment
    async fn destroy(&self, env: DisposableEnv) -> Result<(), ResolverError> {
        env.close()
    }
}

/// Runtime version manager
#[async_trait]
pub trait RuntimeManager: Send + Sync {
    /// Tool name for messages
    fn name(&self) -> &str;

    /// Install the configured runtime if it is missing
    async fn install(&self, root: &Path) -> Result<ToolOutput, ResolverError>;

    /// Run a program inside the managed runtime
    async fn exec(
        &self,
        root: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<ToolOutput, ResolverError>;
}

/// Reject package arguments that the resolver would read as flags
pub fn validate_package_arg(package: &str) -> Result<&str, ResolverError> {
    let trimmed = package.trim();
    if trimmed.is_empty() {
        return Err(ResolverError::invalid_package(package, "must not be empty"));
    }
    if trimmed.starts_with('-') {
        return Err(ResolverError::invalid_package(
            package,
            "must not start with '-'",
        ));
    }
    Ok(trimmed)
}
