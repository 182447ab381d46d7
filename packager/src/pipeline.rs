//! Release pipeline orchestration.
//!
//! The release driver walks the target list strictly in order. Each target
//! moves through provisioning, building, staging, and archiving; the first
//! failing stage ends that target's run and is recorded as its outcome. What
//! happens next is decided by the [`FailurePolicy`]: by default the driver
//! moves on to the next target, so one broken target never hides the others.
//! Nothing is rolled back: files written before a failure stay where they are.

use crate::archiver::Archiver;
use crate::builder::{BuildConfig, Builder};
use crate::config::ReleaseConfig;
use crate::error::{PackagerError, Result};
use crate::executor::CommandExecutor;
use crate::layout::ReleaseLayout;
use crate::output::{write_line, write_lines};
use crate::stager::Stager;
use crate::target::TargetIdentifier;
use crate::toolchain::Provisioner;
use camino::{Utf8Path, Utf8PathBuf};
use log::{trace, warn};
use std::fmt;
use std::io::Write;

/// The four per-target stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseStage {
    /// Installing toolchain support for the target.
    Provisioning,
    /// Compiling the release binary.
    Building,
    /// Copying artefacts into the staging directory.
    Staging,
    /// Compressing the staging directory.
    Archiving,
}

impl ReleaseStage {
    /// Progress message printed when this stage fails for `target`.
    #[must_use]
    pub fn failure_message(self, target: &TargetIdentifier) -> String {
        match self {
            Self::Provisioning => {
                format!("Error occurred while trying to add support for `{target}`")
            }
            Self::Building => format!("Error occurred while trying to build for `{target}`"),
            Self::Staging => format!("Error occurred while trying to stage `{target}`"),
            Self::Archiving => format!("Error occurred while trying to archive `{target}`"),
        }
    }
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Provisioning => "provisioning",
            Self::Building => "building",
            Self::Staging => "staging",
            Self::Archiving => "archiving",
        };
        f.write_str(name)
    }
}

/// Where a target is in its release run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Not started.
    Pending,
    /// Running the given stage.
    Running(ReleaseStage),
    /// Every stage completed.
    Done,
    /// The given stage failed; later stages were skipped.
    Failed(ReleaseStage),
}

impl TargetState {
    /// The state after the current stage completes successfully.
    #[must_use]
    pub const fn advance(self) -> Self {
        match self {
            Self::Pending => Self::Running(ReleaseStage::Provisioning),
            Self::Running(ReleaseStage::Provisioning) => Self::Running(ReleaseStage::Building),
            Self::Running(ReleaseStage::Building) => Self::Running(ReleaseStage::Staging),
            Self::Running(ReleaseStage::Staging) => Self::Running(ReleaseStage::Archiving),
            Self::Running(ReleaseStage::Archiving) | Self::Done => Self::Done,
            Self::Failed(stage) => Self::Failed(stage),
        }
    }

    /// The state after the current stage fails.
    ///
    /// Only a running stage can fail; other states are returned unchanged.
    #[must_use]
    pub const fn fail(self) -> Self {
        match self {
            Self::Running(stage) => Self::Failed(stage),
            other => other,
        }
    }
}

/// Per-target result of a release run.
#[derive(Debug)]
pub enum BuildOutcome {
    /// Every stage completed and the archive was written.
    Succeeded {
        /// The released target.
        target: TargetIdentifier,
        /// Path of the written archive.
        archive: Utf8PathBuf,
    },
    /// A stage failed and the remaining stages were skipped.
    Failed {
        /// The failed target.
        target: TargetIdentifier,
        /// The stage that failed.
        stage: ReleaseStage,
        /// Captured diagnostic text.
        diagnostics: String,
    },
}

impl BuildOutcome {
    /// The target this outcome belongs to.
    #[must_use]
    pub fn target(&self) -> &TargetIdentifier {
        match self {
            Self::Succeeded { target, .. } | Self::Failed { target, .. } => target,
        }
    }

    /// Whether every stage completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// What the driver does after a target fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report the failure and continue with the next target.
    #[default]
    Continue,
    /// Report the failure and stop; remaining targets are skipped.
    FailFast,
}

/// Outcomes of a complete release run.
#[derive(Debug, Default)]
pub struct ReleaseSummary {
    outcomes: Vec<BuildOutcome>,
    skipped: Vec<TargetIdentifier>,
}

impl ReleaseSummary {
    /// Every outcome, in target order.
    #[must_use]
    pub fn outcomes(&self) -> &[BuildOutcome] {
        &self.outcomes
    }

    /// Targets never attempted because of [`FailurePolicy::FailFast`].
    #[must_use]
    pub fn skipped(&self) -> &[TargetIdentifier] {
        &self.skipped
    }

    /// Outcomes that succeeded.
    pub fn succeeded(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Outcomes that failed.
    pub fn failed(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when every target was attempted and succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(BuildOutcome::is_success)
    }
}

/// Drives provisioning, building, staging, and archiving for each target.
pub struct ReleaseDriver<'a> {
    provisioner: Provisioner<'a>,
    builder: Builder<'a>,
    stager: Stager,
    archiver: Archiver,
    policy: FailurePolicy,
    quiet: bool,
}

impl<'a> ReleaseDriver<'a> {
    /// Assemble a driver from its stages.
    #[must_use]
    pub fn new(
        provisioner: Provisioner<'a>,
        builder: Builder<'a>,
        stager: Stager,
        archiver: Archiver,
    ) -> Self {
        Self {
            provisioner,
            builder,
            stager,
            archiver,
            policy: FailurePolicy::default(),
            quiet: false,
        }
    }

    /// Assemble a driver for `config`, running commands through `executor`.
    #[must_use]
    pub fn from_config(
        config: &ReleaseConfig,
        executor: &'a dyn CommandExecutor,
        verbosity: u8,
    ) -> Self {
        let layout = ReleaseLayout::new(config.release_root.clone(), config.binary_name.clone());
        let build_config = BuildConfig {
            project_root: config.project_root.clone(),
            binary_name: config.binary_name.clone(),
            toolchain: config.toolchain.clone(),
            target_dir: config.target_dir.clone(),
            jobs: config.jobs,
            verbosity,
        };
        let policy = if config.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        };

        Self::new(
            Provisioner::new(executor, config.toolchain.clone()),
            Builder::new(executor, build_config),
            Stager::new(layout.clone(), config.runtime_file.clone()),
            Archiver::new(layout),
        )
        .with_policy(policy)
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Suppress progress lines; failures are still reported.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// The release root all outputs are written under.
    #[must_use]
    pub fn release_root(&self) -> &Utf8Path {
        self.stager.layout().root()
    }

    /// Release every target in order, reporting progress to `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::ReleaseRootUnavailable`] if the release root
    /// cannot be created. Per-target failures never abort the run with an
    /// error; they are recorded in the returned summary.
    pub fn run(
        &self,
        targets: &[TargetIdentifier],
        progress: &mut dyn Write,
    ) -> Result<ReleaseSummary> {
        self.stager.prepare()?;

        let mut summary = ReleaseSummary::default();
        let mut remaining = targets.iter();

        for target in remaining.by_ref() {
            self.progress(progress, format!("Building target `{target}`"));
            let outcome = self.release_target(target);
            self.report(progress, &outcome);

            let stop = !outcome.is_success() && self.policy == FailurePolicy::FailFast;
            summary.outcomes.push(outcome);
            if stop {
                break;
            }
        }

        summary.skipped = remaining.cloned().collect();
        for target in &summary.skipped {
            self.progress(progress, format!("Skipped target `{target}`"));
        }

        Ok(summary)
    }

    /// Run every stage for one target and classify the result.
    #[must_use]
    pub fn release_target(&self, target: &TargetIdentifier) -> BuildOutcome {
        match self.run_stages(target) {
            Ok(archive) => BuildOutcome::Succeeded {
                target: target.clone(),
                archive,
            },
            Err(StageError { stage, error }) => {
                warn!("{target} failed during {stage}: {error}");
                BuildOutcome::Failed {
                    target: target.clone(),
                    stage,
                    diagnostics: error.diagnostics(),
                }
            }
        }
    }

    fn run_stages(
        &self,
        target: &TargetIdentifier,
    ) -> std::result::Result<Utf8PathBuf, StageError> {
        let failed = |stage| move |error| StageError { stage, error };
        let mut state = TargetState::Pending;

        transition(target, &mut state);
        self.provisioner
            .provision(target)
            .map_err(failed(ReleaseStage::Provisioning))?;

        transition(target, &mut state);
        let artifact = self
            .builder
            .build(target)
            .map_err(failed(ReleaseStage::Building))?;

        transition(target, &mut state);
        let staged = self
            .stager
            .stage(&artifact)
            .map_err(failed(ReleaseStage::Staging))?;

        transition(target, &mut state);
        let archive = self
            .archiver
            .archive(&staged)
            .map_err(failed(ReleaseStage::Archiving))?;

        transition(target, &mut state);
        Ok(archive)
    }

    fn report(&self, progress: &mut dyn Write, outcome: &BuildOutcome) {
        match outcome {
            BuildOutcome::Succeeded { target, archive } => {
                self.progress(progress, format!("Build complete for target `{target}`"));
                trace!("{target} archived at {archive}");
            }
            BuildOutcome::Failed {
                target,
                stage,
                diagnostics,
            } => {
                write_line(progress, stage.failure_message(target));
                write_lines(progress, diagnostics);
            }
        }
    }

    fn progress(&self, progress: &mut dyn Write, message: impl fmt::Display) {
        if !self.quiet {
            write_line(progress, message);
        }
    }
}

/// An error raised by one release stage.
struct StageError {
    stage: ReleaseStage,
    error: PackagerError,
}

fn transition(target: &TargetIdentifier, state: &mut TargetState) {
    let next = state.advance();
    trace!("{target}: {state:?} -> {next:?}");
    *state = next;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
