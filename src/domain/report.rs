//! Run report types
//!
//! Every step of a run records one `StepReport`. The caller decides the exit
//! status from the aggregated report, never from an individual step.

use super::drift::Drift;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Steps of the sync procedure and the setup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create the lockfile if absent
    EnsureLock,
    /// Copy the previous production list aside
    Backup,
    /// Export the production requirement list
    ExportProduction,
    /// Export the development requirement list
    ExportDevelopment,
    /// Render the dependency tree snapshot
    ExportTree,
    /// Dry-run install or syntactic validation
    Validate,
    /// Compare against the previous production list
    DetectDrift,
    /// Install the language runtime through the version manager
    InstallRuntime,
    /// Create / refresh the project environment
    SyncEnvironment,
    /// Install pre-commit hooks
    InstallHooks,
}

impl Step {
    /// Human-readable step name
    pub fn display_name(&self) -> &'static str {
        match self {
            Step::EnsureLock => "Lockfile",
            Step::Backup => "Backup",
            Step::ExportProduction => "Production requirements",
            Step::ExportDevelopment => "Development requirements",
            Step::ExportTree => "Dependency tree",
            Step::Validate => "Validation",
            Step::DetectDrift => "Drift check",
            Step::InstallRuntime => "Runtime",
            Step::SyncEnvironment => "Environment",
            Step::InstallHooks => "Pre-commit hooks",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepStatus {
    /// Step completed
    Ok(String),
    /// Step had nothing to do
    Skipped(String),
    /// Advisory failure, the run continues
    Warning(String),
    /// Fatal failure, the run stops
    Failed(String),
}

impl StepStatus {
    /// Message attached to the outcome
    pub fn message(&self) -> &str {
        match self {
            StepStatus::Ok(m)
            | StepStatus::Skipped(m)
            | StepStatus::Warning(m)
            | StepStatus::Failed(m) => m,
        }
    }
}

/// Recorded outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Which step
    pub step: Step,
    /// How it went
    #[serde(flatten)]
    pub status: StepStatus,
    /// Extra lines shown in verbose output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl StepReport {
    /// Completed step
    pub fn ok(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Ok(message.into()),
            details: Vec::new(),
        }
    }

    /// Skipped step
    pub fn skipped(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped(message.into()),
            details: Vec::new(),
        }
    }

    /// Advisory failure
    pub fn warning(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Warning(message.into()),
            details: Vec::new(),
        }
    }

    /// Fatal failure
    pub fn failed(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed(message.into()),
            details: Vec::new(),
        }
    }

    /// Attach verbose detail lines
    pub fn with_details(mut self, details: impl IntoIterator<Item = String>) -> Self {
        self.details.extend(details);
        self
    }

    /// Returns true for a fatal outcome
    pub fn is_fatal(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }

    /// Returns true for an advisory failure
    pub fn is_warning(&self) -> bool {
        matches!(self.status, StepStatus::Warning(_))
    }
}

/// How installability was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    /// Dry-run install into a disposable environment
    DryRun,
    /// Line-by-line syntactic check
    Syntactic,
}

/// A requirements line rejected by the syntactic validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidLine {
    /// 1-based line number
    pub line: usize,
    /// The offending text, trimmed
    pub content: String,
}

/// Aggregated report of one run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Project root the run operated on
    pub project_root: PathBuf,
    /// Step outcomes in execution order
    pub steps: Vec<StepReport>,
    /// Drift signal, when the drift step ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<Drift>,
    /// Validation method used, when validation ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationMethod>,
    /// Lines rejected by syntactic validation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_lines: Vec<InvalidLine>,
    /// Files written during the run
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub written: Vec<PathBuf>,
    /// When the run completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    /// Creates an empty report for a project root
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Stamps the completion time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Records a step outcome
    pub fn push(&mut self, report: StepReport) {
        self.steps.push(report);
    }

    /// The fatal step, if any
    pub fn fatal(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.is_fatal())
    }

    /// Returns true if a step aborted the run
    pub fn is_fatal(&self) -> bool {
        self.fatal().is_some()
    }

    /// Advisory failures in order
    pub fn warnings(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.is_warning())
    }

    /// Outcome of a given step
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Returns true when drift was detected
    pub fn has_drift(&self) -> bool {
        self.drift.as_ref().is_some_and(Drift::is_changed)
    }
}
