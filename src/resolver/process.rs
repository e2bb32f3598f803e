//! External command execution
//!
//! Children are spawned with `kill_on_drop` so that dropping a pending
//! invocation (e.g. on Ctrl+C) never leaves a resolver process behind.

use crate::error::ResolverError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Captured output of a finished external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    /// The command line that was executed
    pub command: String,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

/// A command to run in a project root
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ToolCommand {
    /// Create a command for `program` run inside `working_dir`
    pub fn new(program: impl Into<PathBuf>, working_dir: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Printable command line, using the program's file name
    pub fn display(&self) -> String {
        let program = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string());
        std::iter::once(program)
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Arguments passed to the program
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Run to completion, failing on a non-zero exit status
    pub async fn run(&self) -> Result<ToolOutput, ResolverError> {
        let command = self.display();
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ResolverError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(ToolOutput {
                command,
                stdout,
                stderr,
            })
        } else {
            Err(ResolverError::command_failed(
                command,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            ))
        }
    }
}

/// Resolve a tool name (or explicit path) on PATH
pub fn locate(tool: &str) -> Result<PathBuf, ResolverError> {
    which::which(tool).map_err(|_| ResolverError::not_found(tool))
}
