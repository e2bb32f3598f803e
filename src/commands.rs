//! Thin subcommands wrapping resolver and runtime manager operations
//!
//! This module provides:
//! - `add`, `add-dev`, `remove`, `update`, `tree` and `check` passthroughs
//! - The `setup` sequence: runtime install → environment sync → pre-commit hooks
//! - The manifest precondition shared by every subcommand

use crate::config::ProjectConfig;
use crate::domain::{Step, StepReport, SyncReport};
use crate::error::{AppError, ManifestError};
use crate::manifest::manifest_path;
use crate::progress::Progress;
use crate::resolver::{validate_package_arg, Resolver, RuntimeManager, ToolOutput};
use serde::Serialize;
use std::path::Path;

/// Pre-commit configuration that enables hook installation
pub const PRE_COMMIT_CONFIG: &str = ".pre-commit-config.yaml";

/// Outputs of the external commands a thin subcommand ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandReport {
    /// Subcommand name
    pub subcommand: String,
    /// Outputs in execution order
    pub outputs: Vec<ToolOutput>,
}

impl CommandReport {
    fn new(subcommand: &str, outputs: Vec<ToolOutput>) -> Self {
        Self {
            subcommand: subcommand.to_string(),
            outputs,
        }
    }
}

/// Fail unless the project root holds a manifest
pub fn require_manifest(root: &Path) -> Result<(), ManifestError> {
    let path = manifest_path(root);
    if path.is_file() {
        Ok(())
    } else {
        Err(ManifestError::not_found(path))
    }
}

/// `add <package>`
pub async fn add(
    resolver: &dyn Resolver,
    config: &ProjectConfig,
    package: &str,
) -> Result<CommandReport, AppError> {
    let package = validate_package_arg(package)?;
    let output = resolver.add(&config.root, package, None).await?;
    Ok(CommandReport::new("add", vec![output]))
}

/// `add-dev <package>`, targeting the configured development group
pub async fn add_dev(
    resolver: &dyn Resolver,
    config: &ProjectConfig,
    package: &str,
) -> Result<CommandReport, AppError> {
    let package = validate_package_arg(package)?;
    let output = resolver
        .add(&config.root, package, Some(&config.dev_group))
        .await?;
    Ok(CommandReport::new("add-dev", vec![output]))
}

/// `remove <package>`
pub async fn remove(
    resolver: &dyn Resolver,
    config: &ProjectConfig,
    package: &str,
) -> Result<CommandReport, AppError> {
    let package = validate_package_arg(package)?;
    let output = resolver.remove(&config.root, package).await?;
    Ok(CommandReport::new("remove", vec![output]))
}

/// `update [package]`: upgrade in the lockfile, then refresh the environment
pub async fn update(
    resolver: &dyn Resolver,
    config: &ProjectConfig,
    package: Option<&str>,
) -> Result<CommandReport, AppError> {
    let package = package.map(validate_package_arg).transpose()?;
    let upgraded = resolver.upgrade(&config.root, package).await?;
    let synced = resolver.sync_environment(&config.root).await?;
    Ok(CommandReport::new("update", vec![upgraded, synced]))
}

/// `tree`: the full dependency graph
pub async fn tree(
    resolver: &dyn Resolver,
    config: &ProjectConfig,
) -> Result<CommandReport, AppError> {
    let stdout = resolver.tree(&config.root).await?;
    let output = ToolOutput {
        command: format!("{} tree --frozen", resolver.name()),
        stdout,
        stderr: String::new(),
    };
    Ok(CommandReport::new("tree", vec![output]))
}

/// `check`: conflict check of the installed environment
pub async fn check(
    resolver: &dyn Resolver,
    config: &ProjectConfig,
) -> Result<CommandReport, AppError> {
    let output = resolver.check(&config.root).await?;
    Ok(CommandReport::new("check", vec![output]))
}

/// `setup`: bootstrap a development environment.
///
/// The runtime install and hook installation are advisory. Only the
/// environment sync can fail the run. `runtime` is `None` when the runtime
/// manager is not installed.
pub async fn setup(
    resolver: &dyn Resolver,
    runtime: Option<&dyn RuntimeManager>,
    config: &ProjectConfig,
    show_progress: bool,
) -> SyncReport {
    let root = config.root.as_path();
    let mut report = SyncReport::new(root);
    let mut progress = Progress::new(show_progress);

    progress.spinner("Installing runtime...");
    report.push(match runtime {
        Some(runtime) => match runtime.install(root).await {
            Ok(output) => StepReport::ok(Step::InstallRuntime, output.command.clone())
                .with_details(tool_details(&output)),
            Err(e) => StepReport::warning(Step::InstallRuntime, e.to_string()),
        },
        None => StepReport::warning(
            Step::InstallRuntime,
            format!("'{}' not found; using the runtime on PATH", config.runtime_manager),
        ),
    });

    progress.spinner("Syncing environment...");
    match resolver.sync_environment(root).await {
        Ok(output) => report.push(
            StepReport::ok(Step::SyncEnvironment, output.command.clone())
                .with_details(tool_details(&output)),
        ),
        Err(e) => {
            report.push(StepReport::failed(Step::SyncEnvironment, e.to_string()));
            report.finish();
            return report;
        }
    }

    progress.spinner("Installing pre-commit hooks...");
    let step = if !root.join(PRE_COMMIT_CONFIG).is_file() {
        StepReport::skipped(Step::InstallHooks, format!("no {}", PRE_COMMIT_CONFIG))
    } else {
        // The located binary, so `--resolver` aliases resolve the same way here
        let program = resolver.program().display().to_string();
        match runtime {
            Some(runtime) => match runtime
                .exec(root, &program, &["run", "pre-commit", "install"])
                .await
            {
                Ok(output) => StepReport::ok(Step::InstallHooks, output.command.clone())
                    .with_details(tool_details(&output)),
                Err(e) => StepReport::warning(Step::InstallHooks, e.to_string()),
            },
            None => StepReport::warning(
                Step::InstallHooks,
                format!("'{}' not found; hooks not installed", config.runtime_manager),
            ),
        }
    };
    report.push(step);

    progress.finish_and_clear();
    report.finish();
    report
}

fn tool_details(output: &ToolOutput) -> Vec<String> {
    output
        .stderr
        .lines()
        .chain(output.stdout.lines())
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
