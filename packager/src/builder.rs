//! Cargo release builds for a single target.
//!
//! The builder runs `cargo build --release --target <triple>` in the project
//! root and reports where cargo places the resulting binary. It only checks
//! the exit status; a binary missing despite a successful build surfaces when
//! the stager copies it.

use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, Invocation, stderr_diagnostics};
use crate::target::TargetIdentifier;
use camino::Utf8PathBuf;
use log::debug;

/// Configuration for the build process.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory containing the project's `Cargo.toml`.
    pub project_root: Utf8PathBuf,
    /// Name of the binary target to package.
    pub binary_name: String,
    /// Optional toolchain channel (`cargo +<channel>`).
    pub toolchain: Option<String>,
    /// Cargo target directory override (`CARGO_TARGET_DIR`).
    pub target_dir: Option<Utf8PathBuf>,
    /// Number of parallel build jobs (None for cargo default).
    pub jobs: Option<usize>,
    /// Cargo verbosity level (number of `-v` flags).
    pub verbosity: u8,
}

impl BuildConfig {
    /// The cargo target directory in effect.
    #[must_use]
    pub fn effective_target_dir(&self) -> Utf8PathBuf {
        self.target_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join("target"))
    }
}

/// Result of building a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// The target that was built.
    pub target: TargetIdentifier,
    /// Where cargo placed the release binary.
    pub binary_path: Utf8PathBuf,
}

/// Builder for compiling the project for one target at a time.
pub struct Builder<'a> {
    executor: &'a dyn CommandExecutor,
    config: BuildConfig,
}

impl<'a> Builder<'a> {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, config: BuildConfig) -> Self {
        Self { executor, config }
    }

    /// Build the project in release mode for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BuildFailed`] with cargo's error stream if the
    /// build exits unsuccessfully, or the executor's error if cargo cannot be
    /// run.
    pub fn build(&self, target: &TargetIdentifier) -> Result<BuildArtifact> {
        let invocation = self.invocation(target);
        debug!("building {target} in {}", self.config.project_root);
        let output = self.executor.run(&invocation)?;

        if !output.status.success() {
            return Err(PackagerError::BuildFailed {
                target: target.clone(),
                diagnostics: stderr_diagnostics(&output),
            });
        }

        Ok(BuildArtifact {
            target: target.clone(),
            binary_path: self.binary_path(target),
        })
    }

    /// Describe the cargo command used for `target`.
    #[must_use]
    pub fn invocation(&self, target: &TargetIdentifier) -> Invocation {
        let mut invocation = Invocation::new("cargo");

        if let Some(channel) = &self.config.toolchain {
            invocation = invocation.arg(format!("+{channel}"));
        }
        invocation = invocation.args(["build", "--release", "--target", target.as_str()]);

        if let Some(jobs) = self.config.jobs {
            invocation = invocation.args(["-j".to_owned(), jobs.to_string()]);
        }

        for _ in 0..self.config.verbosity {
            invocation = invocation.arg("-v");
        }

        if let Some(dir) = &self.config.target_dir {
            invocation = invocation.env("CARGO_TARGET_DIR", dir.as_str());
        }

        invocation.current_dir(self.config.project_root.clone())
    }

    /// Compute where cargo writes the release binary for `target`.
    ///
    /// The layout is `<target-dir>/<triple>/release/<binary>[.exe]`.
    #[must_use]
    pub fn binary_path(&self, target: &TargetIdentifier) -> Utf8PathBuf {
        self.config
            .effective_target_dir()
            .join(target.as_str())
            .join("release")
            .join(format!(
                "{}{}",
                self.config.binary_name,
                target.executable_suffix()
            ))
    }
}
