//! CLI argument parsing module for reqsync

use crate::config::ConfigOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep requirements.txt exports in sync with a uv-managed pyproject.toml
#[derive(Parser, Debug, Clone)]
#[command(
    name = "reqsync",
    version,
    about = "Keep requirements.txt exports in sync with a uv lockfile"
)]
pub struct CliArgs {
    /// Project root containing pyproject.toml
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub path: PathBuf,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output (also honours NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Resolver binary to use instead of the configured one
    #[arg(long, global = true, value_name = "TOOL")]
    pub resolver: Option<String>,

    /// Development dependency group instead of the configured one
    #[arg(long, global = true, value_name = "GROUP")]
    pub dev_group: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a production dependency
    Add {
        /// Package requirement, e.g. `requests>=2.28`
        package: String,
    },

    /// Add a development dependency
    #[command(name = "add-dev")]
    AddDev {
        /// Package requirement, e.g. `pytest-mock`
        package: String,
    },

    /// Remove a dependency
    Remove {
        /// Package name
        package: String,
    },

    /// Upgrade one package, or all packages, then refresh the environment
    Update {
        /// Package to upgrade (default: all)
        package: Option<String>,
    },

    /// Regenerate requirements exports from the lockfile
    Sync {
        /// Skip the installability check
        #[arg(long)]
        skip_validation: bool,

        /// Exit with status 2 when requirements.txt changed
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Print the dependency tree
    Tree,

    /// Check the environment for dependency conflicts
    Check,

    /// Install the runtime, sync the environment and install pre-commit hooks
    Setup,
}

impl CliArgs {
    /// Configuration overrides taken from the command line
    pub fn overrides(&self) -> ConfigOverrides {
        let skip_validation = matches!(
            self.command,
            Command::Sync {
                skip_validation: true,
                ..
            }
        );
        ConfigOverrides {
            resolver: self.resolver.clone(),
            dev_group: self.dev_group.clone(),
            skip_validation,
        }
    }

    /// Check if color output should be disabled
    pub fn color_disabled(&self) -> bool {
        self.no_color || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty())
    }
}
