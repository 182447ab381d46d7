//! Progress and summary text for the release CLI.
//!
//! Progress is written to a caller-supplied sink rather than straight to
//! stdout so tests can capture it. Writes are best-effort: a closed pipe must
//! never fail a release that is otherwise succeeding.

use crate::layout::ReleaseLayout;
use crate::target::TargetIdentifier;
use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write one line of progress text to `out`.
pub fn write_line(out: &mut dyn Write, message: impl Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort; ignore write failures such as a closed pipe.
    }
}

/// Write each line of `text` to `out`, skipping blank lines.
pub fn write_lines(out: &mut dyn Write, text: &str) {
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        write_line(out, line);
    }
}

/// Format the closing message after a release run.
#[must_use]
pub fn success_message(count: usize, release_root: &Utf8Path) -> String {
    let plural = if count == 1 { "package" } else { "packages" };
    format!("Released {count} {plural} to {release_root}")
}

/// Format the closing message when some targets did not release.
#[must_use]
pub fn failure_message(failed: usize, total: usize) -> String {
    let plural = if total == 1 { "target" } else { "targets" };
    format!("{failed} of {total} {plural} failed")
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use baasha_packager::layout::ReleaseLayout;
/// use baasha_packager::output::DryRunInfo;
/// use baasha_packager::target::TargetIdentifier;
///
/// let project = Utf8PathBuf::from("/home/user/baasha");
/// let runtime = project.join("runtime.c");
/// let layout = ReleaseLayout::new(project.join("baasha-releases"), "baasha");
/// let targets = vec![TargetIdentifier::from("x86_64-unknown-linux-gnu")];
///
/// let info = DryRunInfo {
///     version: "0.0.1",
///     project_root: &project,
///     runtime_file: &runtime,
///     layout: &layout,
///     toolchain: None,
///     target_source: "configured target list".to_owned(),
///     fail_fast: false,
///     jobs: None,
///     targets: &targets,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("baasha-x86_64-unknown-linux-gnu.zip"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Release version.
    pub version: &'a str,
    /// Root of the Cargo project being released.
    pub project_root: &'a Utf8Path,
    /// Runtime file bundled into every package.
    pub runtime_file: &'a Utf8Path,
    /// Naming policy for the release outputs.
    pub layout: &'a ReleaseLayout,
    /// Optional toolchain channel.
    pub toolchain: Option<&'a str>,
    /// Human-readable description of where the targets came from.
    pub target_source: String,
    /// Whether the run stops at the first failure.
    pub fail_fast: bool,
    /// Optional parallel job count.
    pub jobs: Option<usize>,
    /// Targets to be released, in order.
    pub targets: &'a [TargetIdentifier],
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no commands will be run and no files will be modified".to_owned(),
            String::new(),
            format!("Version: {}", self.version),
            format!("Project root: {}", self.project_root),
            format!("Binary: {}", self.layout.binary_name()),
            format!("Runtime file: {}", self.runtime_file),
            format!("Release root: {}", self.layout.root()),
            format!("Toolchain: {}", self.toolchain.unwrap_or("default")),
            format!("Targets from: {}", self.target_source),
            format!("Fail fast: {}", self.fail_fast),
        ];

        if let Some(jobs) = self.jobs {
            lines.push(format!("Parallel jobs: {jobs}"));
        }

        lines.push(String::new());
        lines.push("Targets to release:".to_owned());
        if self.targets.is_empty() {
            lines.push("  (resolved when the release runs)".to_owned());
        }
        for target in self.targets {
            lines.push(format!("  - {target}"));
            lines.push(format!("      staging: {}", self.layout.staging_dir(target)));
            lines.push(format!("      archive: {}", self.layout.archive_path(target)));
        }

        lines.join("\n")
    }
}
