//! Target identifiers for release builds.
//!
//! A target identifier names a compilation target (platform, architecture,
//! and ABI) such as `x86_64-unknown-linux-gnu`. The packager treats it as an
//! opaque string: no syntax validation is performed, and downstream stages only
//! concatenate it into paths and command arguments.

use std::fmt;

/// An opaque compilation target identifier.
///
/// # Examples
///
/// ```
/// use baasha_packager::target::TargetIdentifier;
///
/// let target = TargetIdentifier::from("x86_64-unknown-linux-gnu");
/// assert_eq!(target.as_str(), "x86_64-unknown-linux-gnu");
/// assert!(!target.is_windows());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetIdentifier(String);

impl TargetIdentifier {
    /// Create a new target identifier.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    /// Parse one line of toolchain output into an identifier.
    ///
    /// Surrounding whitespace is trimmed; blank lines yield `None`.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the identifier names a Windows target.
    ///
    /// Only used to derive the executable suffix of the compiled binary.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.0.contains("windows")
    }

    /// Return the executable file suffix for this target (`.exe` or empty).
    #[must_use]
    pub fn executable_suffix(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }
}

impl AsRef<str> for TargetIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TargetIdentifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
