//! Project configuration
//!
//! Precedence: CLI flags > `[tool.reqsync]` in pyproject.toml > defaults.
//!
//! ```toml
//! [tool.reqsync]
//! production-file = "requirements.txt"
//! dev-file = "requirements-dev.txt"
//! tree-file = "dependency-tree.txt"
//! dev-group = "dev"
//! resolver = "uv"
//! runtime-manager = "mise"
//! validate = true
//! ```

use crate::error::{AppError, ConfigError};
use crate::manifest::{manifest_path, Manifest};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

/// Default production requirement list
pub const DEFAULT_PRODUCTION_FILE: &str = "requirements.txt";
/// Default development requirement list
pub const DEFAULT_DEV_FILE: &str = "requirements-dev.txt";
/// Default dependency tree snapshot
pub const DEFAULT_TREE_FILE: &str = "dependency-tree.txt";
/// Default development dependency group
pub const DEFAULT_DEV_GROUP: &str = "dev";
/// Default resolver binary
pub const DEFAULT_RESOLVER: &str = "uv";
/// Default runtime version manager binary
pub const DEFAULT_RUNTIME_MANAGER: &str = "mise";
/// Suffix of the transient backup artifact
pub const BACKUP_SUFFIX: &str = ".backup";

/// Raw `[tool.reqsync]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ToolConfig {
    production_file: Option<String>,
    dev_file: Option<String>,
    tree_file: Option<String>,
    dev_group: Option<String>,
    resolver: Option<String>,
    runtime_manager: Option<String>,
    validate: Option<bool>,
}

/// Overrides coming from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--resolver`
    pub resolver: Option<String>,
    /// `--dev-group`
    pub dev_group: Option<String>,
    /// `--skip-validation`
    pub skip_validation: bool,
}

/// Fully resolved configuration for one project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project root every path is resolved against
    pub root: PathBuf,
    /// Production requirement list file name
    pub production_file: String,
    /// Development requirement list file name
    pub dev_file: String,
    /// Dependency tree snapshot file name
    pub tree_file: String,
    /// Development dependency group
    pub dev_group: String,
    /// Resolver binary
    pub resolver: String,
    /// Runtime version manager binary
    pub runtime_manager: String,
    /// Whether installability validation runs
    pub validate: bool,
}

impl ProjectConfig {
    /// Defaults for a project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            production_file: DEFAULT_PRODUCTION_FILE.to_string(),
            dev_file: DEFAULT_DEV_FILE.to_string(),
            tree_file: DEFAULT_TREE_FILE.to_string(),
            dev_group: DEFAULT_DEV_GROUP.to_string(),
            resolver: DEFAULT_RESOLVER.to_string(),
            runtime_manager: DEFAULT_RUNTIME_MANAGER.to_string(),
            validate: true,
        }
    }

    /// Load configuration for a project root. A missing manifest yields the
    /// defaults; the sync procedure reports that precondition itself.
    pub fn load(root: &Path, overrides: &ConfigOverrides) -> Result<Self, AppError> {
        // Child processes run inside the root, so paths handed to them must
        // not be relative to our own working directory
        let root = std::path::absolute(root).map_err(|e| ConfigError::InvalidPath {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        let tool_table = if manifest_path(&root).is_file() {
            Manifest::load(&root, DEFAULT_DEV_GROUP)?.tool_config
        } else {
            None
        };
        Ok(Self::resolve(&root, tool_table, overrides)?)
    }

    /// Merge defaults, the raw tool table and CLI overrides
    pub fn resolve(
        root: &Path,
        tool_table: Option<toml::Value>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let tool: ToolConfig = match tool_table {
            Some(value) => value
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::InvalidToolTable {
                    path: manifest_path(root),
                    message: e.to_string(),
                })?,
            None => ToolConfig::default(),
        };

        let mut config = Self::new(root);
        if let Some(name) = tool.production_file {
            config.production_file = checked_file_name(name)?;
        }
        if let Some(name) = tool.dev_file {
            config.dev_file = checked_file_name(name)?;
        }
        if let Some(name) = tool.tree_file {
            config.tree_file = checked_file_name(name)?;
        }
        if let Some(group) = tool.dev_group {
            config.dev_group = group;
        }
        if let Some(resolver) = tool.resolver {
            config.resolver = resolver;
        }
        if let Some(manager) = tool.runtime_manager {
            config.runtime_manager = manager;
        }
        if let Some(validate) = tool.validate {
            config.validate = validate;
        }

        if let Some(resolver) = &overrides.resolver {
            config.resolver = resolver.clone();
        }
        if let Some(group) = &overrides.dev_group {
            config.dev_group = group.clone();
        }
        if overrides.skip_validation {
            config.validate = false;
        }

        let artifacts = [&config.production_file, &config.dev_file, &config.tree_file];
        for (i, a) in artifacts.iter().enumerate() {
            if artifacts[i + 1..].contains(a) {
                return Err(ConfigError::ConflictingOptions {
                    message: format!("'{}' is configured for more than one artifact", a),
                });
            }
        }

        Ok(config)
    }

    /// Production requirement list path
    pub fn production_path(&self) -> PathBuf {
        self.root.join(&self.production_file)
    }

    /// Development requirement list path
    pub fn dev_path(&self) -> PathBuf {
        self.root.join(&self.dev_file)
    }

    /// Dependency tree snapshot path
    pub fn tree_path(&self) -> PathBuf {
        self.root.join(&self.tree_file)
    }

    /// Backup artifact path
    pub fn backup_path(&self) -> PathBuf {
        self.root
            .join(format!("{}{}", self.production_file, BACKUP_SUFFIX))
    }
}

// Artifacts live directly in the project root
fn checked_file_name(name: String) -> Result<String, ConfigError> {
    let path = Path::new(&name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(ConfigError::InvalidPath {
            path: PathBuf::from(&name),
            message: "artifact names must be plain file names in the project root".to_string(),
        }),
    }
}
