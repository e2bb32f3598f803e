//! Text output formatter for human-readable display
//!
//! This module provides:
//! - One status line per step (`✓` ok, `-` skipped, `⚠` warning, `✗` failed)
//! - Per-package drift breakdown with major/minor/patch indication
//! - Tool output passthrough for thin subcommands

use crate::commands::CommandReport;
use crate::domain::{ChangeType, Drift, PackageChange, Step, StepReport, StepStatus, SyncReport};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn symbol(&self, status: &StepStatus) -> String {
        let (plain, colored) = match status {
            StepStatus::Ok(_) => ("✓", "✓".green()),
            StepStatus::Skipped(_) => ("-", "-".dimmed()),
            StepStatus::Warning(_) => ("⚠", "⚠".yellow()),
            StepStatus::Failed(_) => ("✗", "✗".red().bold()),
        };
        if self.color {
            colored.to_string()
        } else {
            plain.to_string()
        }
    }

    fn change_label(&self, change: ChangeType) -> String {
        if !self.color {
            return change.label().to_string();
        }
        match change {
            ChangeType::Major => change.label().red().bold().to_string(),
            ChangeType::Minor => change.label().yellow().to_string(),
            ChangeType::Patch => change.label().green().to_string(),
            ChangeType::Unknown => change.label().dimmed().to_string(),
        }
    }

    /// Details are always shown for warnings and failures
    fn shows_details(&self, step: &StepReport) -> bool {
        match self.verbosity {
            Verbosity::Verbose => true,
            Verbosity::Normal => !matches!(step.status, StepStatus::Ok(_) | StepStatus::Skipped(_)),
            Verbosity::Quiet => false,
        }
    }

    fn format_step(&self, step: &StepReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let quiet = self.verbosity == Verbosity::Quiet;
        if quiet && !(step.is_warning() || step.is_fatal()) {
            return Ok(());
        }

        let name = if self.color {
            step.step.display_name().bold().to_string()
        } else {
            step.step.display_name().to_string()
        };
        writeln!(
            writer,
            "{} {}: {}",
            self.symbol(&step.status),
            name,
            step.status.message()
        )?;

        // Drift lines are rendered from the structured changes instead
        if step.step != Step::DetectDrift && self.shows_details(step) {
            for detail in &step.details {
                if self.color {
                    writeln!(writer, "    {}", detail.dimmed())?;
                } else {
                    writeln!(writer, "    {}", detail)?;
                }
            }
        }
        Ok(())
    }

    fn format_change(&self, change: &PackageChange, writer: &mut dyn Write) -> std::io::Result<()> {
        if !self.color {
            return writeln!(writer, "    {}", change);
        }
        match change {
            PackageChange::Added { name, specifier } => {
                writeln!(writer, "    {} {}{}", "+".green(), name, specifier.dimmed())
            }
            PackageChange::Removed { name, specifier } => {
                writeln!(writer, "    {} {}{}", "-".red(), name, specifier.dimmed())
            }
            PackageChange::Updated {
                name,
                old,
                new,
                change,
            } => writeln!(
                writer,
                "    {} {} {} {} {} [{}]",
                "~".yellow(),
                name,
                old.dimmed(),
                "→".dimmed(),
                new.bright_white().bold(),
                self.change_label(*change)
            ),
        }
    }

    fn format_drift(&self, drift: &Drift, writer: &mut dyn Write) -> std::io::Result<()> {
        let Drift::Changed { changes } = drift else {
            return Ok(());
        };
        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        for change in changes {
            self.format_change(change, writer)?;
        }
        if changes.is_empty() {
            writeln!(writer, "    (formatting or comment changes only)")?;
        }
        Ok(())
    }

    fn format_summary(&self, report: &SyncReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let warnings = report.warnings().count();

        if let Some(fatal) = report.fatal() {
            let line = format!("Failed at step: {}", fatal.step);
            if self.color {
                writeln!(writer, "{}", line.red().bold())?;
            } else {
                writeln!(writer, "{}", line)?;
            }
            return Ok(());
        }

        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }

        if warnings > 0 {
            let line = format!("Completed with {} warning(s)", warnings);
            if self.color {
                writeln!(writer, "{}", line.yellow())?;
            } else {
                writeln!(writer, "{}", line)?;
            }
        } else if self.color {
            writeln!(writer, "{}", "Completed".green())?;
        } else {
            writeln!(writer, "Completed")?;
        }

        if self.verbosity == Verbosity::Verbose {
            for path in &report.written {
                writeln!(writer, "  wrote {}", path.display())?;
            }
            if let Some(finished) = report.finished_at {
                writeln!(writer, "  finished at {}", finished.format("%Y/%m/%d %H:%M:%S"))?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format_report(&self, report: &SyncReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Verbose {
            writeln!(writer, "Project: {}", report.project_root.display())?;
        }

        for step in &report.steps {
            self.format_step(step, writer)?;
            if step.step == Step::DetectDrift {
                if let Some(drift) = &report.drift {
                    self.format_drift(drift, writer)?;
                }
            }
        }

        if self.verbosity != Verbosity::Quiet && !report.steps.is_empty() {
            writeln!(writer)?;
        }
        self.format_summary(report, writer)
    }

    fn format_command(
        &self,
        report: &CommandReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        for output in &report.outputs {
            if self.verbosity == Verbosity::Verbose {
                if self.color {
                    writeln!(writer, "{} {}", "$".dimmed(), output.command.dimmed())?;
                } else {
                    writeln!(writer, "$ {}", output.command)?;
                }
                for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
                    writeln!(writer, "  {}", line)?;
                }
            }

            // The tool's stdout is the payload (tree, conflict report)
            write!(writer, "{}", output.stdout)?;
            if !output.stdout.is_empty() && !output.stdout.ends_with('\n') {
                writeln!(writer)?;
            }

            if self.verbosity == Verbosity::Normal && output.stdout.is_empty() {
                let done = self.symbol(&StepStatus::Ok(String::new()));
                writeln!(writer, "{} {}", done, output.command)?;
            }
        }
        Ok(())
    }
}
