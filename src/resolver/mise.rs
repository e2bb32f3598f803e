//! `mise` backed runtime manager

use super::process::{locate, ToolCommand, ToolOutput};
use super::RuntimeManager;
use crate::error::ResolverError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Runtime manager backed by the `mise` binary
#[derive(Debug, Clone)]
pub struct MiseRuntime {
    name: String,
    program: PathBuf,
}

impl MiseRuntime {
    /// Create a runtime manager for an already-located binary
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
        }
    }

    /// Locate `tool` on PATH
    pub fn locate(tool: &str) -> Result<Self, ResolverError> {
        let program = locate(tool)?;
        Ok(Self::new(tool, program))
    }
}

#[async_trait]
impl RuntimeManager for MiseRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    async fn install(&self, root: &Path) -> Result<ToolOutput, ResolverError> {
        // `mise install` is a no-op for tools that are already present
        ToolCommand::new(&self.program, root)
            .arg("install")
            .run()
            .await
    }

    async fn exec(
        &self,
        root: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<ToolOutput, ResolverError> {
        ToolCommand::new(&self.program, root)
            .args(["exec", "--", program])
            .args(args.iter().copied())
            .run()
            .await
    }
}
