//! Deterministic naming of release outputs.
//!
//! Every output path is a pure function of the release root, the binary name,
//! and the target identifier:
//!
//! ```text
//! <release-root>/
//!   <binary>-<target>/
//!     <binary>[.exe]
//!     <runtime-file>
//!   <binary>-<target>.zip
//! ```
//!
//! Re-running a release therefore lands on the same paths, and the archiver
//! can find a staging directory without extra bookkeeping.

use crate::target::TargetIdentifier;
use camino::{Utf8Path, Utf8PathBuf};

/// The fixed file extension for release archives.
const ARCHIVE_EXTENSION: &str = ".zip";

/// Naming policy for staging directories and archives under a release root.
///
/// # Examples
///
/// ```
/// use baasha_packager::layout::ReleaseLayout;
/// use baasha_packager::target::TargetIdentifier;
///
/// let layout = ReleaseLayout::new("/srv/baasha-releases", "baasha");
/// let target = TargetIdentifier::from("x86_64-unknown-linux-gnu");
///
/// assert_eq!(
///     layout.staging_dir(&target),
///     "/srv/baasha-releases/baasha-x86_64-unknown-linux-gnu"
/// );
/// assert_eq!(
///     layout.archive_path(&target),
///     "/srv/baasha-releases/baasha-x86_64-unknown-linux-gnu.zip"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLayout {
    root: Utf8PathBuf,
    binary_name: String,
}

impl ReleaseLayout {
    /// Create a layout rooted at `root` for packages of `binary_name`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            binary_name: binary_name.into(),
        }
    }

    /// The release root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The packaged binary's name.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Name of the staging directory for `target` (`<binary>-<target>`).
    #[must_use]
    pub fn staging_dir_name(&self, target: &TargetIdentifier) -> String {
        format!("{}-{target}", self.binary_name)
    }

    /// Full path of the staging directory for `target`.
    #[must_use]
    pub fn staging_dir(&self, target: &TargetIdentifier) -> Utf8PathBuf {
        self.root.join(self.staging_dir_name(target))
    }

    /// File name of the archive for `target` (`<binary>-<target>.zip`).
    #[must_use]
    pub fn archive_name(&self, target: &TargetIdentifier) -> String {
        format!("{}{ARCHIVE_EXTENSION}", self.staging_dir_name(target))
    }

    /// Full path of the archive for `target`.
    #[must_use]
    pub fn archive_path(&self, target: &TargetIdentifier) -> Utf8PathBuf {
        self.root.join(self.archive_name(target))
    }

    /// File name the binary is given inside the staging directory.
    ///
    /// Windows targets keep the `.exe` suffix cargo produced.
    #[must_use]
    pub fn staged_binary_name(&self, target: &TargetIdentifier) -> String {
        format!("{}{}", self.binary_name, target.executable_suffix())
    }
}
