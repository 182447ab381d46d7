//! CLI argument definitions for the release packager.
//!
//! Flags override values read from `release.toml`; anything not given on the
//! command line keeps its configured (or default) value.

use crate::config::{ReleaseConfig, TargetSelection};
use camino::Utf8PathBuf;
use clap::Parser;

/// Build, stage, and archive Baasha release packages.
#[derive(Parser, Debug, Default)]
#[command(name = "baasha-release")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build, stage, and archive Baasha release packages.\n\n",
    "For every target, the packager installs toolchain support with rustup, ",
    "builds the compiler in release mode, copies the binary and the runtime ",
    "file into <release-root>/baasha-<target>/, and compresses that directory ",
    "into <release-root>/baasha-<target>.zip.\n\n",
    "A failing target is reported and skipped; the remaining targets are still ",
    "released. The exit status is 2 when any target failed.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Release the configured targets:\n",
    "    $ baasha-release\n\n",
    "  Release specific targets:\n",
    "    $ baasha-release -t x86_64-unknown-linux-gnu -t aarch64-apple-darwin\n\n",
    "  Release every target the toolchain reports:\n",
    "    $ baasha-release --all-targets\n\n",
    "  Preview without building:\n",
    "    $ baasha-release --dry-run",
))]
pub struct Cli {
    /// Configuration file [default: release.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Release a specific target triple (can be repeated).
    #[arg(short, long = "target", value_name = "TRIPLE")]
    pub targets: Vec<String>,

    /// Release every target reported by the toolchain.
    #[arg(long, conflicts_with = "targets")]
    pub all_targets: bool,

    /// Directory receiving staging directories and archives.
    #[arg(long, value_name = "DIR")]
    pub release_root: Option<Utf8PathBuf>,

    /// Toolchain channel used for rustup and cargo.
    #[arg(long, value_name = "TOOLCHAIN")]
    pub toolchain: Option<String>,

    /// Number of parallel cargo build jobs.
    #[arg(
        short,
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub jobs: Option<usize>,

    /// Kill any external command running longer than this many seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Stop at the first failed target.
    #[arg(long)]
    pub fail_fast: bool,

    /// Show the release plan and exit without building.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase cargo and log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (failures still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Apply command-line overrides to a loaded configuration.
    ///
    /// Paths given on the command line are used as typed, relative to the
    /// process working directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use baasha_packager::cli::Cli;
    /// use baasha_packager::config::ReleaseConfig;
    ///
    /// let cli = Cli {
    ///     targets: vec!["aarch64-apple-darwin".to_owned()],
    ///     fail_fast: true,
    ///     ..Cli::default()
    /// };
    /// let mut config = ReleaseConfig::default();
    /// cli.apply_to(&mut config);
    ///
    /// assert_eq!(config.targets.list, ["aarch64-apple-darwin"]);
    /// assert!(config.fail_fast);
    /// ```
    pub fn apply_to(&self, config: &mut ReleaseConfig) {
        if !self.targets.is_empty() {
            config.targets.source = TargetSelection::Static;
            config.targets.list.clone_from(&self.targets);
        } else if self.all_targets {
            config.targets.source = TargetSelection::Toolchain;
        }

        if let Some(root) = &self.release_root {
            config.release_root.clone_from(root);
        }
        if self.toolchain.is_some() {
            config.toolchain.clone_from(&self.toolchain);
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if self.timeout.is_some() {
            config.command_timeout_secs = self.timeout;
        }
        config.fail_fast |= self.fail_fast;
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
