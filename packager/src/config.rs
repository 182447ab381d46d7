//! Release configuration loaded from `release.toml`.
//!
//! The configuration describes what to package (binary name, auxiliary runtime
//! file), where to put it (release root), and which targets to build. Every
//! field has a default matching the Baasha project layout, so an absent file
//! or an empty table still yields a usable configuration:
//!
//! ```toml
//! version = "0.0.1"
//! binary_name = "baasha"
//! runtime_file = "runtime.c"
//! release_root = "baasha-releases"
//!
//! [targets]
//! source = "static"
//! list = ["x86_64-unknown-linux-gnu"]
//! ```
//!
//! Relative paths are resolved once at load time: `project_root` against the
//! directory holding the configuration file, everything else against
//! `project_root`. Nothing downstream consults the process working directory.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// File name probed in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "release.toml";

/// Complete release configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Release version, reported in progress output.
    pub version: String,
    /// Name of the compiled binary, also used to derive staging names.
    pub binary_name: String,
    /// Auxiliary runtime file copied unmodified into every package.
    pub runtime_file: Utf8PathBuf,
    /// Directory receiving staging directories and archives.
    pub release_root: Utf8PathBuf,
    /// Root of the Cargo project being released.
    pub project_root: Utf8PathBuf,
    /// Optional Cargo target directory override.
    pub target_dir: Option<Utf8PathBuf>,
    /// Optional toolchain channel for `rustup` and `cargo +<channel>`.
    pub toolchain: Option<String>,
    /// Number of parallel build jobs passed to cargo.
    pub jobs: Option<usize>,
    /// Wall-clock limit for each external command, in seconds.
    pub command_timeout_secs: Option<u64>,
    /// Stop after the first failed target instead of continuing.
    pub fail_fast: bool,
    /// Target enumeration settings.
    pub targets: TargetsConfig,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            version: "0.0.1".to_owned(),
            binary_name: "baasha".to_owned(),
            runtime_file: Utf8PathBuf::from("runtime.c"),
            release_root: Utf8PathBuf::from("baasha-releases"),
            project_root: Utf8PathBuf::from("."),
            target_dir: None,
            toolchain: None,
            jobs: None,
            command_timeout_secs: None,
            fail_fast: false,
            targets: TargetsConfig::default(),
        }
    }
}

/// How the list of targets is produced.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TargetSelection {
    /// Use the configured `list` verbatim.
    #[default]
    Static,
    /// Ask the toolchain for every target it supports.
    Toolchain,
}

/// Settings for the target enumerator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetsConfig {
    /// Which enumeration strategy to use.
    pub source: TargetSelection,
    /// Targets for the static strategy, in build order.
    pub list: Vec<String>,
    /// Substrings a toolchain-reported target must contain (any of them).
    pub filter: Vec<String>,
    /// Maximum number of toolchain-reported targets to keep.
    pub limit: Option<usize>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            source: TargetSelection::Static,
            list: vec!["x86_64-unknown-linux-gnu".to_owned()],
            filter: Vec::new(),
            limit: Some(10),
        }
    }
}

impl ReleaseConfig {
    /// Load and resolve the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ConfigRead`] if the file cannot be read and
    /// [`PackagerError::InvalidConfig`] if it cannot be parsed or validated.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| PackagerError::ConfigRead {
                path: path.to_owned(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Utf8Path::new(""));
        Self::from_toml_str(&contents, path).map(|config| config.resolve_paths(base))
    }

    /// Locate the configuration for a run started in `working_dir`.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] in
    /// `working_dir` is used when present; otherwise the defaults apply,
    /// rooted at `working_dir`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::load`].
    pub fn discover(explicit: Option<&Utf8Path>, working_dir: &Utf8Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            debug!("using configuration {candidate}");
            return Self::load(&candidate);
        }

        debug!("no {DEFAULT_CONFIG_FILE} in {working_dir}; using defaults");
        Ok(Self::default().resolve_paths(working_dir))
    }

    /// Parse and validate configuration text without resolving paths.
    ///
    /// `path` is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfig`] on parse or validation failure.
    pub fn from_toml_str(contents: &str, path: &Utf8Path) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| PackagerError::InvalidConfig {
            path: path.to_owned(),
            reason: format!("TOML parse error: {e}"),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Root every relative path: `project_root` against `base`, the rest
    /// against `project_root`.
    #[must_use]
    pub fn resolve_paths(mut self, base: &Utf8Path) -> Self {
        self.project_root = rooted(base, &self.project_root);
        self.release_root = rooted(&self.project_root, &self.release_root);
        self.runtime_file = rooted(&self.project_root, &self.runtime_file);
        self.target_dir = self
            .target_dir
            .map(|dir| rooted(&self.project_root, &dir));
        self
    }

    /// The per-command timeout, if one is configured.
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self, path: &Utf8Path) -> Result<()> {
        let invalid = |reason: &str| PackagerError::InvalidConfig {
            path: path.to_owned(),
            reason: reason.to_owned(),
        };

        if self.binary_name.trim().is_empty() {
            return Err(invalid("binary_name must not be empty"));
        }
        if self.binary_name.contains(['/', '\\']) {
            return Err(invalid("binary_name must be a file name, not a path"));
        }
        if self.runtime_file.file_name().is_none() {
            return Err(invalid("runtime_file must name a file"));
        }
        if self.targets.limit == Some(0) {
            return Err(invalid("targets.limit must be at least 1"));
        }
        if self.jobs == Some(0) {
            return Err(invalid("jobs must be at least 1"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(invalid("command_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

fn rooted(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        base.join(path)
    }
}
