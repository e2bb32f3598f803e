//! Sync procedure: lockfile → production / development requirement lists
//!
//! Workflow: ensure lock → backup → export production → export development →
//! tree snapshot → validate → drift.
//!
//! Only the production export can abort a run. Every other step records a
//! warning and the run continues. The backup and the disposable validation
//! environment are owned by guards, so they are released on every exit path
//! including cancellation of the `run` future.

mod backup;
mod validate;
mod writer;

pub use backup::BackupGuard;
pub use validate::{invalid_lines, is_valid_line};
pub use writer::atomic_write;

use crate::config::ProjectConfig;
use crate::domain::{
    Drift, RequirementsFile, Step, StepReport, SyncReport, ValidationMethod,
};
use crate::error::{ResolverError, SyncError};
use crate::manifest::{has_lockfile, Manifest};
use crate::progress::Progress;
use crate::resolver::{ExportScope, Provisioner, Resolver, UvResolver};
use std::path::Path;

/// Locate the configured resolver on PATH
pub fn locate_resolver(config: &ProjectConfig) -> Result<UvResolver, SyncError> {
    UvResolver::locate(&config.resolver).map_err(|_| SyncError::ResolverNotFound {
        tool: config.resolver.clone(),
    })
}

/// One sync run against a project root
pub struct SyncProcedure<'a> {
    config: &'a ProjectConfig,
    resolver: &'a dyn Resolver,
    provisioner: &'a dyn Provisioner,
}

impl<'a> SyncProcedure<'a> {
    /// Create a procedure for a resolved configuration
    pub fn new(
        config: &'a ProjectConfig,
        resolver: &'a dyn Resolver,
        provisioner: &'a dyn Provisioner,
    ) -> Self {
        Self {
            config,
            resolver,
            provisioner,
        }
    }

    /// Run without progress display
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        self.run_with_progress(false).await
    }

    /// Run the procedure.
    ///
    /// Returns `Err` only for precondition failures, before any file is
    /// touched. A fatal step is recorded in the report instead.
    pub async fn run_with_progress(&self, show_progress: bool) -> Result<SyncReport, SyncError> {
        let root = self.config.root.as_path();
        let manifest =
            Manifest::load(root, &self.config.dev_group).map_err(SyncError::from_manifest)?;

        let mut progress = Progress::new(show_progress);
        let mut report = SyncReport::new(root);

        // Step 1: Lockfile
        progress.spinner("Checking lockfile...");
        report.push(self.ensure_lock(root).await);

        // Step 2: Backup, released when `backup` drops
        progress.spinner("Backing up previous requirements...");
        let backup = match BackupGuard::create(
            &self.config.production_path(),
            &self.config.backup_path(),
        ) {
            Ok(Some(guard)) => {
                report.push(StepReport::ok(
                    Step::Backup,
                    format!("saved {}", guard.path().display()),
                ));
                Some(guard)
            }
            Ok(None) => {
                report.push(StepReport::skipped(
                    Step::Backup,
                    format!("no previous {}", self.config.production_file),
                ));
                None
            }
            Err(e) => {
                let err = SyncError::BackupError {
                    path: self.config.backup_path(),
                    source: e,
                };
                report.push(StepReport::warning(
                    Step::Backup,
                    format!("{}; drift detection unavailable", err),
                ));
                None
            }
        };

        // Step 3: Production list (mandatory)
        progress.spinner("Exporting production requirements...");
        let production = match self.export_production(&manifest, &mut report).await {
            Ok(production) => production,
            Err(message) => {
                report.push(StepReport::failed(Step::ExportProduction, message));
                report.finish();
                return Ok(report);
            }
        };
        let production_bytes = production.render().into_bytes();

        // Step 4: Development list (advisory)
        progress.spinner("Exporting development requirements...");
        let step = self
            .export_development(&manifest, &production, &mut report)
            .await;
        report.push(step);

        // Step 5: Tree snapshot (advisory)
        progress.spinner("Rendering dependency tree...");
        let step = self.export_tree(&manifest, &mut report).await;
        report.push(step);

        // Step 6: Validation (advisory)
        progress.spinner("Validating production requirements...");
        let step = self.validate(&mut report).await;
        report.push(step);

        // Step 7: Drift
        progress.spinner("Checking for drift...");
        let (drift, step) = match &backup {
            Some(guard) => match guard.read() {
                Ok(previous) => {
                    let drift = Drift::detect(&previous, &production_bytes);
                    let details = match &drift {
                        Drift::Changed { changes } => {
                            changes.iter().map(ToString::to_string).collect()
                        }
                        _ => Vec::new(),
                    };
                    let step = StepReport::ok(
                        Step::DetectDrift,
                        format!("{} {}", self.config.production_file, drift.label()),
                    )
                    .with_details(details);
                    (Some(drift), step)
                }
                Err(e) => (
                    None,
                    StepReport::warning(
                        Step::DetectDrift,
                        format!("failed to read backup: {}", e),
                    ),
                ),
            },
            None => (
                Some(Drift::NoBaseline),
                StepReport::skipped(Step::DetectDrift, "no previous production list"),
            ),
        };
        report.drift = drift;
        report.push(step);

        progress.finish_and_clear();
        drop(backup);
        report.finish();
        Ok(report)
    }

    async fn ensure_lock(&self, root: &Path) -> StepReport {
        if has_lockfile(root) {
            return StepReport::ok(Step::EnsureLock, "uv.lock present");
        }
        match self.resolver.lock(root).await {
            Ok(_) => StepReport::ok(Step::EnsureLock, "created uv.lock"),
            Err(e) => StepReport::warning(Step::EnsureLock, e.to_string()),
        }
    }

    async fn export_production(
        &self,
        manifest: &Manifest,
        report: &mut SyncReport,
    ) -> Result<RequirementsFile, String> {
        let scope = ExportScope::Production {
            dev_group: self.config.dev_group.clone(),
        };
        let raw = self
            .resolver
            .export(&self.config.root, &scope)
            .await
            .map_err(|e| e.to_string())?;

        let (production, removed) =
            RequirementsFile::parse(&raw)
                .strip_self_references(manifest.project_name.as_deref(), Some(self.config.root.as_path()));

        let path = self.config.production_path();
        atomic_write(&path, production.render().as_bytes())
            .map_err(|e| SyncError::write_error(&path, e).to_string())?;
        report.written.push(path);

        let missing = manifest.missing_dependencies(&production);
        report.push(
            StepReport::ok(
                Step::ExportProduction,
                format!(
                    "{} ({} packages)",
                    self.config.production_file,
                    production.len()
                ),
            )
            .with_details(removed.into_iter().map(|l| format!("stripped self-reference: {}", l)))
            .with_details(missing.into_iter().map(not_exported)),
        );
        Ok(production)
    }

    async fn export_development(
        &self,
        manifest: &Manifest,
        production: &RequirementsFile,
        report: &mut SyncReport,
    ) -> StepReport {
        let scope = ExportScope::Group(self.config.dev_group.clone());
        let raw = match self.resolver.export(&self.config.root, &scope).await {
            Ok(raw) => raw,
            Err(e) => return StepReport::warning(Step::ExportDevelopment, e.to_string()),
        };

        let (development, _) =
            RequirementsFile::parse(&raw).strip_self_references(None, Some(self.config.root.as_path()));
        let missing: Vec<String> = manifest
            .missing_dev_dependencies(&development)
            .into_iter()
            .map(not_exported)
            .collect();
        let (development, shared) = development.without_packages(&production.package_names());

        let path = self.config.dev_path();
        if let Err(e) = atomic_write(&path, development.render().as_bytes()) {
            return StepReport::warning(
                Step::ExportDevelopment,
                SyncError::write_error(&path, e).to_string(),
            );
        }
        report.written.push(path);

        StepReport::ok(
            Step::ExportDevelopment,
            format!("{} ({} packages)", self.config.dev_file, development.len()),
        )
        .with_details(
            shared
                .into_iter()
                .map(|l| format!("already in production list: {}", l)),
        )
        .with_details(missing)
    }

    async fn export_tree(&self, manifest: &Manifest, report: &mut SyncReport) -> StepReport {
        let tree = match self.resolver.tree(&self.config.root).await {
            Ok(tree) => tree,
            Err(e) => return StepReport::warning(Step::ExportTree, e.to_string()),
        };

        let project = manifest.project_name.as_deref().unwrap_or("project");
        let content = format!(
            "# Dependency tree for {} ({} tree --frozen)\n\n{}",
            project,
            self.resolver.name(),
            tree
        );

        let path = self.config.tree_path();
        if let Err(e) = atomic_write(&path, content.as_bytes()) {
            return StepReport::warning(
                Step::ExportTree,
                SyncError::write_error(&path, e).to_string(),
            );
        }
        report.written.push(path);
        StepReport::ok(Step::ExportTree, self.config.tree_file.clone())
    }

    async fn validate(&self, report: &mut SyncReport) -> StepReport {
        if !self.config.validate {
            return StepReport::skipped(Step::Validate, "validation disabled");
        }

        let root = self.config.root.as_path();
        let requirements = self.config.production_path();

        let fallback_reason = match self.provisioner.create(root).await {
            Ok(env) => {
                let result = self
                    .provisioner
                    .install(root, &env, &requirements, true)
                    .await;
                let destroyed = self.provisioner.destroy(env).await;

                match result {
                    Err(ResolverError::DryRunUnsupported { tool }) => {
                        format!("{} has no dry-run install", tool)
                    }
                    result => {
                        report.validation = Some(ValidationMethod::DryRun);
                        let step = match result {
                            Ok(_) => StepReport::ok(Step::Validate, "dry-run install succeeded"),
                            Err(e) => StepReport::warning(
                                Step::Validate,
                                format!("dry-run install failed: {}", e),
                            ),
                        };
                        return match destroyed {
                            Ok(()) => step,
                            Err(e) => step.with_details([format!("cleanup failed: {}", e)]),
                        };
                    }
                }
            }
            Err(e) => format!("disposable environment unavailable: {}", e),
        };

        self.validate_syntax(&requirements, fallback_reason, report)
    }

    fn validate_syntax(
        &self,
        requirements: &Path,
        fallback_reason: String,
        report: &mut SyncReport,
    ) -> StepReport {
        report.validation = Some(ValidationMethod::Syntactic);

        let content = match std::fs::read_to_string(requirements) {
            Ok(content) => content,
            Err(e) => {
                return StepReport::warning(
                    Step::Validate,
                    format!("cannot read {}: {}", requirements.display(), e),
                )
            }
        };

        let invalid = invalid_lines(&content);
        let step = if invalid.is_empty() {
            StepReport::ok(Step::Validate, "syntactic check passed")
        } else {
            StepReport::warning(
                Step::Validate,
                format!("{} malformed line(s)", invalid.len()),
            )
            .with_details(
                invalid
                    .iter()
                    .map(|l| format!("line {}: {}", l.line, l.content)),
            )
        };
        report.invalid_lines = invalid;
        step.with_details([format!("fell back to syntactic check: {}", fallback_reason)])
    }
}

// A declared dependency missing from the export usually means a stale lockfile
fn not_exported(name: &str) -> String {
    format!("declared but not exported: {}", name)
}
