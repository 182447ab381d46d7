//! Target enumeration strategies.
//!
//! The release driver consumes an ordered, finite list of targets. Where that
//! list comes from is pluggable: a static configured list, or the full set of
//! targets the installed toolchain reports via `rustc --print target-list`,
//! optionally filtered and truncated.

use crate::config::{ReleaseConfig, TargetSelection};
use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, Invocation, stderr_diagnostics};
use crate::target::TargetIdentifier;
use log::{debug, trace};
use std::collections::HashSet;

/// A strategy producing the targets to release.
pub trait TargetSource {
    /// Produce the targets in build order.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy needs the toolchain and the query
    /// fails.
    fn targets(&self, executor: &dyn CommandExecutor) -> Result<Vec<TargetIdentifier>>;

    /// Short human-readable description of the strategy.
    fn describe(&self) -> String;
}

/// A fixed list of targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTargets {
    targets: Vec<TargetIdentifier>,
}

impl StaticTargets {
    /// Create a static source from identifiers in build order.
    #[must_use]
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TargetIdentifier>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

impl TargetSource for StaticTargets {
    fn targets(&self, _executor: &dyn CommandExecutor) -> Result<Vec<TargetIdentifier>> {
        Ok(self.targets.clone())
    }

    fn describe(&self) -> String {
        format!("{} configured target(s)", self.targets.len())
    }
}

/// Every target the toolchain supports, optionally narrowed down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainTargets {
    toolchain: Option<String>,
    filter: Vec<String>,
    limit: Option<usize>,
}

impl ToolchainTargets {
    /// Create a toolchain-backed source.
    ///
    /// A target is kept when it contains any of the `filter` substrings (an
    /// empty filter keeps everything); at most `limit` targets are kept.
    #[must_use]
    pub fn new(toolchain: Option<String>, filter: Vec<String>, limit: Option<usize>) -> Self {
        Self {
            toolchain,
            filter,
            limit,
        }
    }

    fn invocation(&self) -> Invocation {
        let invocation = Invocation::new("rustc");
        let invocation = match &self.toolchain {
            Some(channel) => invocation.arg(format!("+{channel}")),
            None => invocation,
        };
        invocation.args(["--print", "target-list"])
    }

    fn keep(&self, target: &TargetIdentifier) -> bool {
        self.filter.is_empty()
            || self
                .filter
                .iter()
                .any(|needle| target.as_str().contains(needle.as_str()))
    }
}

impl TargetSource for ToolchainTargets {
    fn targets(&self, executor: &dyn CommandExecutor) -> Result<Vec<TargetIdentifier>> {
        let invocation = self.invocation();
        let output = executor
            .run(&invocation)
            .map_err(|e| PackagerError::EnumerationFailed {
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PackagerError::EnumerationFailed {
                reason: format!("`{invocation}` failed: {}", stderr_diagnostics(&output)),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported: Vec<TargetIdentifier> =
            stdout.lines().filter_map(TargetIdentifier::from_line).collect();
        debug!("toolchain reports {} target(s)", reported.len());

        let kept = reported
            .into_iter()
            .filter(|target| self.keep(target))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(kept)
    }

    fn describe(&self) -> String {
        let mut description = "targets reported by rustc".to_owned();
        if !self.filter.is_empty() {
            description.push_str(&format!(" matching {}", self.filter.join(" or ")));
        }
        if let Some(limit) = self.limit {
            description.push_str(&format!(" (first {limit})"));
        }
        description
    }
}

/// Build the source selected by the configuration.
#[must_use]
pub fn configured_source(config: &ReleaseConfig) -> Box<dyn TargetSource> {
    match config.targets.source {
        TargetSelection::Static => Box::new(StaticTargets::new(config.targets.list.iter().cloned())),
        TargetSelection::Toolchain => Box::new(ToolchainTargets::new(
            config.toolchain.clone(),
            config.targets.filter.clone(),
            config.targets.limit,
        )),
    }
}

/// Run `source` and normalise its output.
///
/// Duplicates are dropped, keeping the first occurrence, so a target is never
/// staged twice in one run.
///
/// # Errors
///
/// Propagates source errors and returns [`PackagerError::NoTargets`] when the
/// resulting list is empty.
pub fn enumerate_targets(
    source: &dyn TargetSource,
    executor: &dyn CommandExecutor,
) -> Result<Vec<TargetIdentifier>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for target in source.targets(executor)? {
        if seen.insert(target.clone()) {
            targets.push(target);
        } else {
            trace!("skipping duplicate target {target}");
        }
    }

    if targets.is_empty() {
        return Err(PackagerError::NoTargets);
    }
    Ok(targets)
}
