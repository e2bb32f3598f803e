//! reqsync - requirements export CLI for uv-managed Python projects
//!
//! Regenerates `requirements.txt`, `requirements-dev.txt` and
//! `dependency-tree.txt` from `uv.lock`, and wraps the day-to-day
//! `uv` / `mise` commands.

use clap::Parser;
use reqsync::cli::{CliArgs, Command};
use reqsync::commands::{self, CommandReport};
use reqsync::config::ProjectConfig;
use reqsync::domain::SyncReport;
use reqsync::output::{create_formatter, OutputConfig, OutputFormatter};
use reqsync::resolver::{MiseRuntime, Resolver, RuntimeManager};
use reqsync::sync::{locate_resolver, SyncProcedure};
use std::io::{self, Write};
use std::process::ExitCode;

/// Exit status when drift is detected with `--fail-on-drift`
const EXIT_DRIFT: u8 = 2;

/// Exit status after Ctrl+C
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.color_disabled() {
        colored::control::set_override(false);
    }

    // Dropping `run` on Ctrl+C or SIGTERM kills the running child and
    // releases the backup and disposable environment guards before we exit.
    tokio::select! {
        result = run(args) => match result {
            Ok(exit_code) => exit_code,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        signal = shutdown_signal() => {
            eprintln!("Interrupted ({})", signal);
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// Resolves with the signal name on Ctrl+C or SIGTERM. A handler that cannot
/// be installed never resolves, so the run is not cut short.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(e) => {
                eprintln!("Warning: ctrl-c handler failed: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                eprintln!("Warning: SIGTERM handler failed: {}", e);
                std::future::pending().await
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    if args.verbose {
        eprintln!("reqsync v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Target: {}", args.path.display());
    }

    let root = args.path.as_path();
    let output_config =
        OutputConfig::from_cli(args.json, args.verbose, args.quiet, args.color_disabled());
    let show_progress = output_config.show_progress();
    let formatter = create_formatter(output_config);

    // Preconditions: nothing is touched unless both hold
    commands::require_manifest(root)?;
    let config = ProjectConfig::load(root, &args.overrides())?;
    let resolver = locate_resolver(&config)?;

    if args.verbose {
        eprintln!("Resolver: {}", resolver.program().display());
    }

    let report = match &args.command {
        Command::Sync { fail_on_drift, .. } => {
            let procedure = SyncProcedure::new(&config, &resolver, &resolver);
            let report = procedure.run_with_progress(show_progress).await?;
            write_report(formatter.as_ref(), &report)?;

            return Ok(if report.is_fatal() {
                ExitCode::FAILURE
            } else if *fail_on_drift && report.has_drift() {
                ExitCode::from(EXIT_DRIFT)
            } else {
                ExitCode::SUCCESS
            });
        }
        Command::Setup => {
            let runtime = MiseRuntime::locate(&config.runtime_manager).ok();
            let report = commands::setup(
                &resolver,
                runtime.as_ref().map(|r| r as &dyn RuntimeManager),
                &config,
                show_progress,
            )
            .await;
            write_report(formatter.as_ref(), &report)?;

            return Ok(if report.is_fatal() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            });
        }
        Command::Add { package } => commands::add(&resolver, &config, package).await?,
        Command::AddDev { package } => commands::add_dev(&resolver, &config, package).await?,
        Command::Remove { package } => commands::remove(&resolver, &config, package).await?,
        Command::Update { package } => {
            commands::update(&resolver, &config, package.as_deref()).await?
        }
        Command::Tree => commands::tree(&resolver, &config).await?,
        Command::Check => commands::check(&resolver, &config).await?,
    };

    write_command(formatter.as_ref(), &report)?;
    Ok(ExitCode::SUCCESS)
}

fn write_report(formatter: &dyn OutputFormatter, report: &SyncReport) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    formatter.format_report(report, &mut stdout)?;
    stdout.flush()
}

fn write_command(formatter: &dyn OutputFormatter, report: &CommandReport) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    formatter.format_command(report, &mut stdout)?;
    stdout.flush()
}
