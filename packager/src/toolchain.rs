//! Toolchain provisioning for release targets.
//!
//! Before a target can be compiled, rustup must have installed the standard
//! library for it. `rustup target add` is idempotent, so provisioning an
//! already-installed target is a cheap no-op success.

use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, Invocation, stderr_diagnostics};
use crate::target::TargetIdentifier;
use log::debug;

/// Installs target support through rustup.
pub struct Provisioner<'a> {
    executor: &'a dyn CommandExecutor,
    toolchain: Option<String>,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner for the default toolchain, or for `toolchain`
    /// when given.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, toolchain: Option<String>) -> Self {
        Self {
            executor,
            toolchain,
        }
    }

    /// Ensure the toolchain can compile for `target`.
    ///
    /// Blocks until `rustup` exits.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ProvisioningFailed`] with the captured error
    /// stream when rustup exits unsuccessfully, or the executor's error if
    /// rustup cannot be run at all.
    pub fn provision(&self, target: &TargetIdentifier) -> Result<()> {
        let invocation = self.invocation(target);
        debug!("provisioning {target}");
        let output = self.executor.run(&invocation)?;

        if output.status.success() {
            return Ok(());
        }

        Err(PackagerError::ProvisioningFailed {
            target: target.clone(),
            diagnostics: stderr_diagnostics(&output),
        })
    }

    /// Describe the rustup command used for `target`.
    #[must_use]
    pub fn invocation(&self, target: &TargetIdentifier) -> Invocation {
        let invocation = Invocation::new("rustup").args(["target", "add"]);
        let invocation = match &self.toolchain {
            Some(channel) => invocation.args(["--toolchain", channel.as_str()]),
            None => invocation,
        };
        invocation.arg(target.as_str())
    }
}
