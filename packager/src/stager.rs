//! File staging for release packages.
//!
//! This module copies a target's compiled binary and the shared runtime file
//! into that target's staging directory under the release root. Staging never
//! changes the process working directory; every path is rooted explicitly.

use crate::builder::BuildArtifact;
use crate::error::{PackagerError, Result};
use crate::layout::ReleaseLayout;
use crate::target::TargetIdentifier;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fs;

/// A staging directory populated for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRelease {
    /// The target the files belong to.
    pub target: TargetIdentifier,
    /// The staging directory.
    pub directory: Utf8PathBuf,
    /// The files written by this staging pass.
    pub files: Vec<Utf8PathBuf>,
}

/// Handles staging of built binaries under the release root.
pub struct Stager {
    layout: ReleaseLayout,
    runtime_file: Utf8PathBuf,
}

impl Stager {
    /// Create a stager writing into `layout` and bundling `runtime_file`.
    #[must_use]
    pub fn new(layout: ReleaseLayout, runtime_file: Utf8PathBuf) -> Self {
        Self {
            layout,
            runtime_file,
        }
    }

    /// Ensure the release root exists.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ReleaseRootUnavailable`] if the directory
    /// cannot be created.
    pub fn prepare(&self) -> Result<()> {
        let root = self.layout.root();
        fs::create_dir_all(root).map_err(|source| PackagerError::ReleaseRootUnavailable {
            path: root.to_owned(),
            source,
        })
    }

    /// Stage a built binary and the runtime file for its target.
    ///
    /// The staging directory is created when absent and left as-is otherwise:
    /// existing files with the same names are overwritten, anything else in it
    /// is kept.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::StagingFailed`] naming the offending path if
    /// the directory cannot be created or either file cannot be copied (for
    /// example because the build produced no binary).
    pub fn stage(&self, artifact: &BuildArtifact) -> Result<StagedRelease> {
        let target = &artifact.target;
        let directory = self.layout.staging_dir(target);
        debug!("staging {target} into {directory}");

        fs::create_dir_all(&directory).map_err(|source| staging_error(target, &directory, source))?;

        let binary_dest = directory.join(self.layout.staged_binary_name(target));
        copy_file(target, &artifact.binary_path, &binary_dest)?;

        let runtime_dest = directory.join(self.runtime_file_name());
        copy_file(target, &self.runtime_file, &runtime_dest)?;

        Ok(StagedRelease {
            target: target.clone(),
            directory,
            files: vec![binary_dest, runtime_dest],
        })
    }

    /// The layout this stager writes into.
    #[must_use]
    pub fn layout(&self) -> &ReleaseLayout {
        &self.layout
    }

    /// The runtime file bundled into every package.
    #[must_use]
    pub fn runtime_file(&self) -> &Utf8Path {
        &self.runtime_file
    }

    fn runtime_file_name(&self) -> &str {
        // The configuration guarantees a file name; fall back to the whole
        // path rather than panic.
        self.runtime_file
            .file_name()
            .unwrap_or_else(|| self.runtime_file.as_str())
    }
}

/// Copy `source` to `dest`, blaming whichever side failed.
fn copy_file(target: &TargetIdentifier, source: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    if !source.is_file() {
        return Err(staging_error(
            target,
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source file not found"),
        ));
    }

    trace!("copying {source} to {dest}");
    fs::copy(source, dest)
        .map(|_| ())
        .map_err(|source_err| staging_error(target, dest, source_err))
}

fn staging_error(target: &TargetIdentifier, path: &Utf8Path, source: std::io::Error) -> PackagerError {
    PackagerError::StagingFailed {
        target: target.clone(),
        path: path.to_owned(),
        source,
    }
}
