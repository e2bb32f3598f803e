//! Core domain models for reqsync
//!
//! This module contains the fundamental types used throughout the application:
//! - Requirement lines and requirements files
//! - Drift between committed and regenerated production lists
//! - Step outcomes and the aggregated run report

mod drift;
mod report;
mod requirement;

pub use drift::{package_changes, ChangeType, Drift, PackageChange};
pub use report::{
    InvalidLine, Step, StepReport, StepStatus, SyncReport, ValidationMethod,
};
pub use requirement::{
    is_self_reference, normalize_name, Requirement, RequirementLine, RequirementsFile,
};
