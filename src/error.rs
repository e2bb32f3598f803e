//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: Issues with reading or parsing pyproject.toml
//! - ResolverError: Issues invoking uv / mise
//! - ConfigError: Issues with CLI or `[tool.reqsync]` configuration
//! - SyncError: Fatal conditions of the sync procedure

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// External tool related errors
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sync procedure errors
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("failed to parse TOML in {path}: {message}")]
    TomlParseError { path: PathBuf, message: String },
}

/// Errors related to invoking external tools
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Tool binary is not on PATH
    #[error("'{tool}' was not found on PATH")]
    NotFound { tool: String },

    /// The process could not be spawned
    #[error("failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status
    #[error("'{command}' exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The tool does not support a dry-run install
    #[error("'{tool}' does not support dry-run installation")]
    DryRunUnsupported { tool: String },

    /// A package argument was rejected before reaching the tool
    #[error("invalid package argument '{value}': {message}")]
    InvalidPackage { value: String, message: String },

    /// Disposable environment could not be created or removed
    #[error("disposable environment error at {path}: {source}")]
    Environment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid `[tool.reqsync]` table
    #[error("invalid [tool.reqsync] configuration in {path}: {message}")]
    InvalidToolTable { path: PathBuf, message: String },

    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

/// Fatal errors of the sync procedure
#[derive(Error, Debug)]
pub enum SyncError {
    /// No pyproject.toml at the project root
    #[error("no manifest at {path}; refusing to run outside a project root")]
    ManifestNotFound { path: PathBuf },

    /// pyproject.toml exists but cannot be read or parsed
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Resolver binary missing
    #[error("resolver '{tool}' is not available on PATH")]
    ResolverNotFound { tool: String },

    /// Artifact write failure
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backup creation failure
    #[error("failed to back up {path}: {source}")]
    BackupError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new TomlParseError
    pub fn toml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::TomlParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ResolverError {
    /// Creates a new NotFound error
    pub fn not_found(tool: impl Into<String>) -> Self {
        ResolverError::NotFound { tool: tool.into() }
    }

    /// Creates a new CommandFailed error
    pub fn command_failed(command: impl Into<String>, status: i32, stderr: impl Into<String>) -> Self {
        ResolverError::CommandFailed {
            command: command.into(),
            status,
            stderr: stderr.into(),
        }
    }

    /// Creates a new InvalidPackage error
    pub fn invalid_package(value: impl Into<String>, message: impl Into<String>) -> Self {
        ResolverError::InvalidPackage {
            value: value.into(),
            message: message.into(),
        }
    }
}

impl SyncError {
    /// Maps a manifest load failure, keeping a missing manifest distinct
    pub fn from_manifest(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound { path } => SyncError::ManifestNotFound { path },
            other => SyncError::Manifest(other),
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::WriteError {
            path: path.into(),
            source,
        }
    }
}
