//! Baasha release packager CLI entrypoint.
//!
//! This binary builds the Baasha compiler for each configured target and
//! packages every build, together with the runtime file, into a per-target zip
//! archive under the release root. Progress goes to stdout; logs and fatal
//! errors go to stderr.

use baasha_packager::cli::Cli;
use baasha_packager::config::{ReleaseConfig, TargetSelection};
use baasha_packager::enumerator::{configured_source, enumerate_targets};
use baasha_packager::error::{PackagerError, Result};
use baasha_packager::executor::{CommandExecutor, SystemCommandExecutor};
use baasha_packager::layout::ReleaseLayout;
use baasha_packager::output::{DryRunInfo, failure_message, success_message, write_line};
use baasha_packager::pipeline::ReleaseDriver;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// How a run that reached the end of the target list finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    /// Every target was released (or the run was a dry run).
    Released,
    /// At least one target failed or was skipped.
    TargetsFailed,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(cli.verbosity, cli.quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_log_level(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<RunStatus> {
    let working_dir = current_dir()?;
    let mut config = ReleaseConfig::discover(cli.config.as_deref(), &working_dir)?;
    cli.apply_to(&mut config);

    let executor = config
        .command_timeout()
        .map_or_else(SystemCommandExecutor::new, SystemCommandExecutor::with_timeout);
    release(cli, &config, &executor, stdout)
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir()?;
    Utf8PathBuf::try_from(dir).map_err(|e| PackagerError::Io(e.into_io_error()))
}

/// Enumerate targets and either print the plan or drive the release.
fn release(
    cli: &Cli,
    config: &ReleaseConfig,
    executor: &dyn CommandExecutor,
    stdout: &mut dyn Write,
) -> Result<RunStatus> {
    let source = configured_source(config);

    if cli.dry_run {
        // Asking rustc for its target list is deferred to a real run.
        let targets = match config.targets.source {
            TargetSelection::Static => enumerate_targets(source.as_ref(), executor)?,
            TargetSelection::Toolchain => Vec::new(),
        };
        let layout = ReleaseLayout::new(config.release_root.clone(), config.binary_name.clone());
        let info = DryRunInfo {
            version: &config.version,
            project_root: &config.project_root,
            runtime_file: &config.runtime_file,
            layout: &layout,
            toolchain: config.toolchain.as_deref(),
            target_source: source.describe(),
            fail_fast: config.fail_fast,
            jobs: config.jobs,
            targets: &targets,
        };
        write_line(stdout, info.display_text());
        return Ok(RunStatus::Released);
    }

    let targets = enumerate_targets(source.as_ref(), executor)?;
    let driver = ReleaseDriver::from_config(config, executor, cli.verbosity).quiet(cli.quiet);

    if !cli.quiet {
        let plural = if targets.len() == 1 { "target" } else { "targets" };
        write_line(
            stdout,
            format!(
                "Releasing {} {} for {} {plural}",
                config.binary_name,
                config.version,
                targets.len()
            ),
        );
    }

    let summary = driver.run(&targets, stdout)?;

    if summary.is_success() {
        if !cli.quiet {
            write_line(
                stdout,
                success_message(summary.outcomes().len(), driver.release_root()),
            );
        }
        return Ok(RunStatus::Released);
    }

    let failed = summary.failed().count() + summary.skipped().len();
    write_line(stdout, failure_message(failed, targets.len()));
    Ok(RunStatus::TargetsFailed)
}

fn exit_code_for_run_result(result: Result<RunStatus>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(RunStatus::Released) => 0,
        Ok(RunStatus::TargetsFailed) => 2,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
