//! Integration tests for reqsync
//!
//! These tests verify:
//! - Sync procedure properties against an in-memory resolver
//! - Cleanup of the backup and disposable environment on every exit path
//! - Configuration from `[tool.reqsync]`

use async_trait::async_trait;
use reqsync::config::{ConfigOverrides, ProjectConfig};
use reqsync::domain::{ChangeType, Drift, PackageChange, Step, ValidationMethod};
use reqsync::error::ResolverError;
use reqsync::resolver::{DisposableEnv, ExportScope, Provisioner, Resolver, ToolOutput};
use reqsync::sync::SyncProcedure;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

const PYPROJECT: &str = r#"[project]
name = "demo-app"
version = "0.1.0"
dependencies = ["requests>=2.28.0"]

[dependency-groups]
dev = ["pytest-mock"]
"#;

const PRODUCTION_EXPORT: &str = "\
# This file was autogenerated by uv via the following command:
#    uv export --format requirements-txt --no-hashes --frozen --no-group dev
-e .
certifi==2024.2.2
    # via requests
requests==2.31.0
    # via demo-app
";

const DEV_EXPORT: &str = "\
-e .
certifi==2024.2.2
    # via requests
pytest==8.1.1
    # via pytest-mock
pytest-mock==3.14.0
requests==2.31.0
";

/// Which resolver call never completes
#[derive(Clone, Copy, PartialEq, Eq)]
enum Hang {
    Never,
    DevExport,
    Install,
}

/// In-memory resolver and provisioner with scripted responses
struct FakeUv {
    production: Mutex<Result<String, String>>,
    development: Result<String, String>,
    dry_run: Result<(), &'static str>,
    hang: Hang,
    env_path: Mutex<Option<PathBuf>>,
}

impl FakeUv {
    fn new() -> Self {
        Self {
            production: Mutex::new(Ok(PRODUCTION_EXPORT.to_string())),
            development: Ok(DEV_EXPORT.to_string()),
            dry_run: Ok(()),
            hang: Hang::Never,
            env_path: Mutex::new(None),
        }
    }

    fn set_production(&self, content: &str) {
        *self.production.lock().unwrap() = Ok(content.to_string());
    }

    fn failure(message: &str) -> ResolverError {
        ResolverError::command_failed("uv export", 2, message)
    }

    fn output(command: &str) -> ToolOutput {
        ToolOutput {
            command: command.to_string(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    async fn hang_if(&self, hang: Hang) {
        if self.hang == hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

#[async_trait]
impl Resolver for FakeUv {
    fn name(&self) -> &str {
        "uv"
    }

    async fn lock(&self, root: &Path) -> Result<ToolOutput, ResolverError> {
        fs::write(root.join("uv.lock"), "version = 1\n").unwrap();
        Ok(Self::output("uv lock"))
    }

    async fn export(&self, _root: &Path, scope: &ExportScope) -> Result<String, ResolverError> {
        match scope {
            ExportScope::Production { .. } => self
                .production
                .lock()
                .unwrap()
                .clone()
                .map_err(|m| Self::failure(&m)),
            ExportScope::Group(_) => {
                self.hang_if(Hang::DevExport).await;
                self.development.clone().map_err(|m| Self::failure(&m))
            }
        }
    }

    async fn tree(&self, _root: &Path) -> Result<String, ResolverError> {
        Ok("demo-app v0.1.0\n└── requests v2.31.0\n    └── certifi v2024.2.2\n".to_string())
    }

    async fn add(
        &self,
        _root: &Path,
        _package: &str,
        _group: Option<&str>,
    ) -> Result<ToolOutput, ResolverError> {
        Ok(Self::output("uv add"))
    }

    async fn remove(&self, _root: &Path, _package: &str) -> Result<ToolOutput, ResolverError> {
        Ok(Self::output("uv remove"))
    }

    async fn upgrade(
        &self,
        _root: &Path,
        _package: Option<&str>,
    ) -> Result<ToolOutput, ResolverError> {
        Ok(Self::output("uv lock --upgrade"))
    }

    async fn sync_environment(&self, _root: &Path) -> Result<ToolOutput, ResolverError> {
        Ok(Self::output("uv sync"))
    }

    async fn check(&self, _root: &Path) -> Result<ToolOutput, ResolverError> {
        Ok(Self::output("uv pip check"))
    }
}

#[async_trait]
impl Provisioner for FakeUv {
    async fn create(&self, _root: &Path) -> Result<DisposableEnv, ResolverError> {
        let env = DisposableEnv::new(tempfile::tempdir().unwrap());
        *self.env_path.lock().unwrap() = Some(env.path().to_path_buf());
        Ok(env)
    }

    async fn install(
        &self,
        _root: &Path,
        _env: &DisposableEnv,
        _requirements: &Path,
        _dry_run: bool,
    ) -> Result<ToolOutput, ResolverError> {
        self.hang_if(Hang::Install).await;
        match self.dry_run {
            Ok(()) => Ok(Self::output("uv pip install --dry-run")),
            Err("unsupported") => Err(ResolverError::DryRunUnsupported {
                tool: "uv".to_string(),
            }),
            Err(message) => Err(Self::failure(message)),
        }
    }
}

/// Create a project root with a manifest and lockfile
fn create_project() -> (TempDir, ProjectConfig) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(dir.path().join("pyproject.toml"), PYPROJECT).unwrap();
    fs::write(dir.path().join("uv.lock"), "version = 1\n").unwrap();
    let config = ProjectConfig::load(dir.path(), &ConfigOverrides::default()).unwrap();
    (dir, config)
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}

mod sync_properties {
    use super::*;

    /// Two runs on an unchanged lockfile produce byte-identical artifacts
    #[tokio::test]
    async fn test_idempotent() {
        let (dir, config) = create_project();
        let uv = FakeUv::new();
        let procedure = SyncProcedure::new(&config, &uv, &uv);

        procedure.run().await.unwrap();
        let first: Vec<String> = ["requirements.txt", "requirements-dev.txt", "dependency-tree.txt"]
            .iter()
            .map(|f| read(&dir, f))
            .collect();

        let report = procedure.run().await.unwrap();
        let second: Vec<String> = ["requirements.txt", "requirements-dev.txt", "dependency-tree.txt"]
            .iter()
            .map(|f| read(&dir, f))
            .collect();

        assert_eq!(first, second);
        assert_eq!(report.drift, Some(Drift::Unchanged));
    }

    /// No package appears in both the production and development lists
    #[tokio::test]
    async fn test_lists_are_disjoint() {
        let (dir, config) = create_project();
        let uv = FakeUv::new();
        SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();

        let dev = read(&dir, "requirements-dev.txt");
        assert!(dev.contains("pytest-mock==3.14.0"));
        assert!(dev.contains("pytest==8.1.1"));
        assert!(!dev.contains("requests"));
        assert!(!dev.contains("certifi"));
        // Annotation of a dropped entry goes with it
        assert!(!dev.contains("# via requests"));
    }

    /// Editable self-references never reach either list
    #[tokio::test]
    async fn test_self_references_stripped() {
        let (dir, config) = create_project();
        let uv = FakeUv::new();
        uv.set_production("-e .\ndemo-app @ file:///work/demo-app\nrequests==2.31.0\n");
        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();

        assert_eq!(read(&dir, "requirements.txt"), "requests==2.31.0\n");
        assert!(!read(&dir, "requirements-dev.txt").contains("-e ."));
        let step = report.step(Step::ExportProduction).unwrap();
        assert_eq!(step.details.len(), 2);
    }

    /// Workspace members and vendored wheels stay in the production list
    #[tokio::test]
    async fn test_local_dependencies_kept() {
        let (dir, config) = create_project();
        let uv = FakeUv::new();
        uv.set_production(
            "-e .\n-e ./packages/core\nlib @ file:///wheels/lib.whl\nrequests==2.31.0\n",
        );
        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();

        assert_eq!(
            read(&dir, "requirements.txt"),
            "-e ./packages/core\nlib @ file:///wheels/lib.whl\nrequests==2.31.0\n"
        );
        let step = report.step(Step::ExportProduction).unwrap();
        assert_eq!(step.details, vec!["stripped self-reference: -e .".to_string()]);
    }

    /// A declared requests + pytest-mock project splits as expected
    #[tokio::test]
    async fn test_requests_and_pytest_mock_scenario() {
        let (dir, config) = create_project();
        let uv = FakeUv::new();
        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();

        assert!(!report.is_fatal());
        assert_eq!(report.warnings().count(), 0);
        let prod = read(&dir, "requirements.txt");
        assert!(prod.contains("requests==2.31.0"));
        assert!(!prod.contains("pytest-mock"));
        assert!(read(&dir, "requirements-dev.txt").contains("pytest-mock"));
        assert!(read(&dir, "dependency-tree.txt").contains("requests v2.31.0"));
        assert_eq!(report.drift, Some(Drift::NoBaseline));
    }

    /// Missing lockfile is generated before exporting
    #[tokio::test]
    async fn test_lockfile_generated_when_absent() {
        let (dir, config) = create_project();
        fs::remove_file(dir.path().join("uv.lock")).unwrap();
        let uv = FakeUv::new();

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert!(dir.path().join("uv.lock").exists());
        assert!(!report.step(Step::EnsureLock).unwrap().is_warning());
    }

    /// Malformed lines are reported when the dry-run install is unavailable
    #[tokio::test]
    async fn test_syntactic_validation_fallback() {
        let (_dir, config) = create_project();
        let mut uv = FakeUv::new();
        uv.dry_run = Err("unsupported");
        uv.set_production("requests==2.31.0\nbad;;version\nweird-package-name-no-version\n");

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert_eq!(report.validation, Some(ValidationMethod::Syntactic));
        assert_eq!(report.invalid_lines.len(), 1);
        assert_eq!(report.invalid_lines[0].line, 2);
        assert!(!report.is_fatal());
    }
}

mod drift_detection {
    use super::*;

    /// A version bump between runs is reported with its change type
    #[tokio::test]
    async fn test_drift_reported_with_breakdown() {
        let (dir, config) = create_project();
        fs::write(dir.path().join("requirements.txt"), "pkgA==1.0.0\n").unwrap();
        let uv = FakeUv::new();
        uv.set_production("pkgA==1.1.0\n");

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert!(report.has_drift());
        assert_eq!(
            report.drift,
            Some(Drift::Changed {
                changes: vec![PackageChange::Updated {
                    name: "pkga".to_string(),
                    old: "==1.0.0".to_string(),
                    new: "==1.1.0".to_string(),
                    change: ChangeType::Minor,
                }]
            })
        );
        assert_eq!(read(&dir, "requirements.txt"), "pkgA==1.1.0\n");
    }

    /// Identical output reports no drift
    #[tokio::test]
    async fn test_no_drift_when_unchanged() {
        let (dir, config) = create_project();
        fs::write(dir.path().join("requirements.txt"), "requests==2.31.0\n").unwrap();
        let uv = FakeUv::new();
        uv.set_production("requests==2.31.0\n");

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert_eq!(report.drift, Some(Drift::Unchanged));
        assert!(!report.has_drift());
    }
}

mod cleanup {
    use super::*;

    fn backup_path(dir: &TempDir) -> PathBuf {
        dir.path().join("requirements.txt.backup")
    }

    /// Backup is gone after a successful run
    #[tokio::test]
    async fn test_backup_removed_on_success() {
        let (dir, config) = create_project();
        fs::write(dir.path().join("requirements.txt"), "requests==2.30.0\n").unwrap();
        let uv = FakeUv::new();

        SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert!(!backup_path(&dir).exists());
    }

    /// Backup is gone after the production export fails; the old list stays
    #[tokio::test]
    async fn test_backup_removed_on_fatal_failure() {
        let (dir, config) = create_project();
        fs::write(dir.path().join("requirements.txt"), "requests==2.30.0\n").unwrap();
        let uv = FakeUv::new();
        *uv.production.lock().unwrap() = Err("lockfile needs to be updated".to_string());

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert!(report.is_fatal());
        assert!(!backup_path(&dir).exists());
        assert_eq!(read(&dir, "requirements.txt"), "requests==2.30.0\n");
        assert!(!dir.path().join("requirements-dev.txt").exists());
    }

    /// Backup is gone after advisory failures
    #[tokio::test]
    async fn test_backup_removed_on_advisory_failure() {
        let (dir, config) = create_project();
        fs::write(dir.path().join("requirements.txt"), "requests==2.30.0\n").unwrap();
        let mut uv = FakeUv::new();
        uv.development = Err("group not found".to_string());
        uv.dry_run = Err("no matching distribution for requests");

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert_eq!(report.warnings().count(), 2);
        assert!(!backup_path(&dir).exists());
    }

    /// Cancelling mid-run releases the backup
    #[tokio::test]
    async fn test_backup_removed_on_cancellation() {
        let (dir, config) = create_project();
        fs::write(dir.path().join("requirements.txt"), "requests==2.30.0\n").unwrap();
        let mut uv = FakeUv::new();
        uv.hang = Hang::DevExport;

        let procedure = SyncProcedure::new(&config, &uv, &uv);
        let result = tokio::time::timeout(Duration::from_millis(100), procedure.run()).await;
        assert!(result.is_err());
        assert!(!backup_path(&dir).exists());
        // The production list was already regenerated before cancellation
        assert!(read(&dir, "requirements.txt").contains("requests==2.31.0"));
    }

    /// Cancelling during validation removes the disposable environment
    #[tokio::test]
    async fn test_environment_removed_on_cancellation() {
        let (dir, config) = create_project();
        let mut uv = FakeUv::new();
        uv.hang = Hang::Install;

        let procedure = SyncProcedure::new(&config, &uv, &uv);
        let result = tokio::time::timeout(Duration::from_millis(100), procedure.run()).await;
        assert!(result.is_err());

        let env = uv.env_path.lock().unwrap().clone().unwrap();
        assert!(!env.exists());
        assert!(!backup_path(&dir).exists());
    }

    /// The environment is removed after a completed validation
    #[tokio::test]
    async fn test_environment_removed_after_validation() {
        let (_dir, config) = create_project();
        let uv = FakeUv::new();

        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert_eq!(report.validation, Some(ValidationMethod::DryRun));
        let env = uv.env_path.lock().unwrap().clone().unwrap();
        assert!(!env.exists());
    }
}

mod configuration {
    use super::*;

    /// `[tool.reqsync]` renames artifacts and the development group
    #[tokio::test]
    async fn test_tool_table_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let pyproject = format!(
            "{}\n[tool.reqsync]\nproduction-file = \"requirements-prod.txt\"\ndev-group = \"test\"\nvalidate = false\n",
            PYPROJECT
        );
        fs::write(dir.path().join("pyproject.toml"), pyproject).unwrap();
        fs::write(dir.path().join("uv.lock"), "version = 1\n").unwrap();

        let config = ProjectConfig::load(dir.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.dev_group, "test");
        assert!(!config.validate);

        let uv = FakeUv::new();
        let report = SyncProcedure::new(&config, &uv, &uv).run().await.unwrap();
        assert!(dir.path().join("requirements-prod.txt").exists());
        assert!(!dir.path().join("requirements.txt").exists());
        assert!(report.validation.is_none());
        assert!(uv.env_path.lock().unwrap().is_none());
    }

    /// Command-line overrides win over the tool table
    #[test]
    fn test_cli_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let pyproject = format!("{}\n[tool.reqsync]\ndev-group = \"test\"\n", PYPROJECT);
        fs::write(dir.path().join("pyproject.toml"), pyproject).unwrap();

        let overrides = ConfigOverrides {
            dev_group: Some("lint".to_string()),
            skip_validation: true,
            ..Default::default()
        };
        let config = ProjectConfig::load(dir.path(), &overrides).unwrap();
        assert_eq!(config.dev_group, "lint");
        assert!(!config.validate);
    }

    /// Unknown keys in the tool table are rejected
    #[test]
    fn test_unknown_tool_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pyproject = format!("{}\n[tool.reqsync]\nprod-file = \"x.txt\"\n", PYPROJECT);
        fs::write(dir.path().join("pyproject.toml"), pyproject).unwrap();

        assert!(ProjectConfig::load(dir.path(), &ConfigOverrides::default()).is_err());
    }
}
