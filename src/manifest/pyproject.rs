//! pyproject.toml reader
//!
//! Handles:
//! - project.name
//! - project.dependencies (PEP 621)
//! - dependency-groups.<group> (PEP 735)
//! - tool.uv.dev-dependencies (legacy uv)
//! - project.optional-dependencies.<group>
//! - tool.reqsync (configuration table, returned raw)

use crate::domain::{Requirement, RequirementsFile};
use crate::error::ManifestError;
use std::path::{Path, PathBuf};
use toml::Value;

/// Manifest filename at the project root
pub const MANIFEST_FILENAME: &str = "pyproject.toml";

/// Name of the configuration table under `[tool]`
pub const TOOL_TABLE: &str = "reqsync";

/// Parsed view of a project's pyproject.toml
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Path the manifest was read from
    pub path: PathBuf,
    /// `[project].name`, if declared
    pub project_name: Option<String>,
    /// Runtime dependencies
    pub dependencies: Vec<Requirement>,
    /// Dependencies of the development group
    pub dev_dependencies: Vec<Requirement>,
    /// Raw `[tool.reqsync]` table
    pub tool_config: Option<Value>,
}

impl Manifest {
    /// Read and parse `<root>/pyproject.toml`
    pub fn load(project_root: &Path, dev_group: &str) -> Result<Self, ManifestError> {
        let path = project_root.join(MANIFEST_FILENAME);
        if !path.is_file() {
            return Err(ManifestError::not_found(&path));
        }
        let content =
            std::fs::read_to_string(&path).map_err(|e| ManifestError::read_error(&path, e))?;
        Self::parse(&content, &path, dev_group)
    }

    /// Parse manifest content
    pub fn parse(content: &str, path: &Path, dev_group: &str) -> Result<Self, ManifestError> {
        let toml: Value = toml::from_str(content)
            .map_err(|e: toml::de::Error| ManifestError::toml_parse_error(path, e.to_string()))?;

        let project = toml.get("project");

        let project_name = project
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let dependencies = project
            .and_then(|p| p.get("dependencies"))
            .map(parse_requirement_array)
            .unwrap_or_default();

        // First declaration wins: PEP 735 groups, legacy uv, then extras
        let dev_dependencies = toml
            .get("dependency-groups")
            .and_then(|g| g.get(dev_group))
            .or_else(|| {
                toml.get("tool")
                    .and_then(|t| t.get("uv"))
                    .and_then(|u| u.get("dev-dependencies"))
            })
            .or_else(|| {
                project
                    .and_then(|p| p.get("optional-dependencies"))
                    .and_then(|o| o.get(dev_group))
            })
            .map(parse_requirement_array)
            .unwrap_or_default();

        let tool_config = toml
            .get("tool")
            .and_then(|t| t.get(TOOL_TABLE))
            .cloned();

        Ok(Self {
            path: path.to_path_buf(),
            project_name,
            dependencies,
            dev_dependencies,
            tool_config,
        })
    }

    /// Declared runtime dependencies that are absent from an exported list
    pub fn missing_dependencies(&self, exported: &RequirementsFile) -> Vec<&str> {
        missing_from(&self.dependencies, exported)
    }

    /// Declared development dependencies that are absent from an exported list
    pub fn missing_dev_dependencies(&self, exported: &RequirementsFile) -> Vec<&str> {
        missing_from(&self.dev_dependencies, exported)
    }
}

fn missing_from<'a>(declared: &'a [Requirement], exported: &RequirementsFile) -> Vec<&'a str> {
    declared
        .iter()
        .filter(|d| !exported.contains(&d.name))
        .map(|d| d.name.as_str())
        .collect()
}

// Non-string entries (e.g. `{ include-group = "lint" }`) are skipped
fn parse_requirement_array(value: &Value) -> Vec<Requirement> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Requirement::parse)
                .collect()
        })
        .unwrap_or_default()
}
