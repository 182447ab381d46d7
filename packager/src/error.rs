//! Error types for the release packager.
//!
//! Each variant carries the context needed to report a failure without
//! further bookkeeping. Per-target failures (provisioning, building, staging,
//! archiving) are turned into [`BuildOutcome`](crate::pipeline::BuildOutcome)
//! values by the release driver; the remaining variants abort the run.

use crate::target::TargetIdentifier;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while producing release archives.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}")]
    ConfigRead {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed or is inconsistent.
    #[error("invalid configuration {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// The toolchain could not report its supported targets.
    #[error("target enumeration failed: {reason}")]
    EnumerationFailed {
        /// Description of the failure.
        reason: String,
    },

    /// The target list resolved to nothing.
    #[error("no targets to build; configure [targets] or pass --target")]
    NoTargets,

    /// An external command could not be started.
    #[error("failed to run {program}: {source}")]
    CommandSpawn {
        /// The program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external command exceeded the configured timeout and was killed.
    #[error("{program} timed out after {seconds} seconds")]
    CommandTimedOut {
        /// The program that timed out.
        program: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// Installing toolchain support for a target failed.
    #[error("error occurred while trying to add support for `{target}`: {diagnostics}")]
    ProvisioningFailed {
        /// The target being provisioned.
        target: TargetIdentifier,
        /// Captured error stream of the install command.
        diagnostics: String,
    },

    /// The release build for a target failed.
    #[error("error occurred while trying to build for `{target}`: {diagnostics}")]
    BuildFailed {
        /// The target being built.
        target: TargetIdentifier,
        /// Captured error stream of the build command.
        diagnostics: String,
    },

    /// The release root directory could not be created.
    #[error("release root {path} is unavailable: {source}")]
    ReleaseRootUnavailable {
        /// Path to the release root.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Copying an artefact into the staging directory failed.
    #[error("staging failed for `{target}` at {path}: {source}")]
    StagingFailed {
        /// The target being staged.
        target: TargetIdentifier,
        /// The path that could not be read or written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the release archive failed.
    #[error("archiving failed for `{target}` at {path}: {source}")]
    ArchiveFailed {
        /// The target being archived.
        target: TargetIdentifier,
        /// Destination archive path.
        path: Utf8PathBuf,
        /// The underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl PackagerError {
    /// Return the diagnostic text to report for a failed target.
    ///
    /// Command failures report the captured error stream verbatim; every other
    /// error reports its display form.
    #[must_use]
    pub fn diagnostics(&self) -> String {
        match self {
            Self::ProvisioningFailed { diagnostics, .. } | Self::BuildFailed { diagnostics, .. } => {
                diagnostics.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
