//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of run reports and thin subcommand outputs
//! - Step detail lines only in verbose mode

use crate::commands::CommandReport;
use crate::domain::SyncReport;
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// Top-level JSON document
#[derive(Serialize)]
struct JsonOutput<'a, T: Serialize> {
    /// Tool version that produced the document
    version: &'static str,
    /// Whether any step aborted the run
    success: bool,
    /// The report itself
    #[serde(flatten)]
    body: &'a T,
}

impl JsonFormatter {
    fn write<T: Serialize>(
        &self,
        success: bool,
        body: &T,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let output = JsonOutput {
            version: env!("CARGO_PKG_VERSION"),
            success,
            body,
        };
        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &SyncReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let success = !report.is_fatal();
        if self.verbosity == Verbosity::Verbose {
            return self.write(success, report, writer);
        }

        let mut report = report.clone();
        for step in &mut report.steps {
            step.details.clear();
        }
        self.write(success, &report, writer)
    }

    fn format_command(
        &self,
        report: &CommandReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write(true, report, writer)
    }
}
