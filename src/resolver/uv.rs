//! `uv` backed resolver and provisioner
//!
//! Every read-only invocation passes `--frozen` so only `lock` and the
//! explicit add/remove/upgrade operations can touch `uv.lock`.

use super::process::{locate, ToolCommand, ToolOutput};
use super::{DisposableEnv, ExportScope, Provisioner, Resolver};
use crate::error::ResolverError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Marker uv's argument parser prints for an unknown flag
const UNKNOWN_FLAG_MARKER: &str = "unexpected argument '--dry-run'";

/// Resolver backed by the `uv` binary
#[derive(Debug, Clone)]
pub struct UvResolver {
    name: String,
    program: PathBuf,
}

impl UvResolver {
    /// Create a resolver for an already-located binary
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
        }
    }

    /// Locate `tool` on PATH
    pub fn locate(tool: &str) -> Result<Self, ResolverError> {
        let program = locate(tool)?;
        Ok(Self::new(tool, program))
    }

    fn command(&self, root: &Path) -> ToolCommand {
        ToolCommand::new(&self.program, root)
    }

    /// Arguments of an export for the given scope
    pub fn export_args(scope: &ExportScope) -> Vec<String> {
        let mut args: Vec<String> = [
            "export",
            "--format",
            "requirements-txt",
            "--no-hashes",
            "--frozen",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        match scope {
            ExportScope::Production { dev_group } => {
                args.push("--no-group".to_string());
                args.push(dev_group.clone());
            }
            ExportScope::Group(group) => {
                args.push("--only-group".to_string());
                args.push(group.clone());
            }
        }
        args
    }
}

#[async_trait]
impl Resolver for UvResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> &Path {
        &self.program
    }

    async fn lock(&self, root: &Path) -> Result<ToolOutput, ResolverError> {
        self.command(root).arg("lock").run().await
    }

    async fn export(&self, root: &Path, scope: &ExportScope) -> Result<String, ResolverError> {
        let output = self
            .command(root)
            .args(Self::export_args(scope))
            .run()
            .await?;
        Ok(output.stdout)
    }

    async fn tree(&self, root: &Path) -> Result<String, ResolverError> {
        let output = self.command(root).args(["tree", "--frozen"]).run().await?;
        Ok(output.stdout)
    }

    async fn add(
        &self,
        root: &Path,
        package: &str,
        group: Option<&str>,
    ) -> Result<ToolOutput, ResolverError> {
        let mut cmd = self.command(root).arg("add");
        if let Some(group) = group {
            cmd = cmd.args(["--group", group]);
        }
        cmd.arg(package).run().await
    }

    async fn remove(&self, root: &Path, package: &str) -> Result<ToolOutput, ResolverError> {
        self.command(root).args(["remove", package]).run().await
    }

    async fn upgrade(
        &self,
        root: &Path,
        package: Option<&str>,
    ) -> Result<ToolOutput, ResolverError> {
        let cmd = match package {
            Some(package) => self
                .command(root)
                .args(["lock", "--upgrade-package", package]),
            None => self.command(root).args(["lock", "--upgrade"]),
        };
        cmd.run().await
    }

    async fn sync_environment(&self, root: &Path) -> Result<ToolOutput, ResolverError> {
        self.command(root).arg("sync").run().await
    }

    async fn check(&self, root: &Path) -> Result<ToolOutput, ResolverError> {
        self.command(root).args(["pip", "check"]).run().await
    }
}

#[async_trait]
impl Provisioner for UvResolver {
    async fn create(&self, root: &Path) -> Result<DisposableEnv, ResolverError> {
        let dir = tempfile::Builder::new()
            .prefix("reqsync-venv-")
            .tempdir()
            .map_err(|source| ResolverError::Environment {
                path: std::env::temp_dir(),
                source,
            })?;
        let env = DisposableEnv::new(dir);

        self.command(root)
            .args(["venv", "--quiet"])
            .arg(env.path().display().to_string())
            .run()
            .await?;
        Ok(env)
    }

    async fn install(
        &self,
        root: &Path,
        env: &DisposableEnv,
        requirements: &Path,
        dry_run: bool,
    ) -> Result<ToolOutput, ResolverError> {
        // The child runs inside `root`
        let requirements = requirements.strip_prefix(root).unwrap_or(requirements);
        let mut cmd = self
            .command(root)
            .args(["pip", "install", "--python"])
            .arg(env.path().display().to_string())
            .arg("-r")
            .arg(requirements.display().to_string());
        if dry_run {
            cmd = cmd.arg("--dry-run");
        }

        match cmd.run().await {
            Err(ResolverError::CommandFailed { stderr, .. })
                if dry_run && stderr.contains(UNKNOWN_FLAG_MARKER) =>
            {
                Err(ResolverError::DryRunUnsupported {
                    tool: self.name.clone(),
                })
            }
            other => other,
        }
    }
}
