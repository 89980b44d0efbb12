//! Version specifications: one concrete version, or a variable range.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single, concrete version string (`1.0`, `2.3.1-rc4`, ...).
///
/// The string is opaque to the graph layer. Ordering is lexical — real
/// version-precedence comparison belongs to the external version parser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SingleVersion(String);

impl SingleVersion {
    /// Create a concrete version from a raw string.
    ///
    /// Returns `None` for an empty string — there is no such thing as a
    /// versionless concrete version.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    /// The raw version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SingleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A version specification attached to a [`ProjectVersionRef`].
///
/// Either a single concrete version, or a variable range/expression
/// (`[1.0,2.0)`, `${some.property}`, ...). A vertex whose version spec is
/// variable belongs to the graph's variable subgraphs until a workspace
/// pins it to a concrete version.
///
/// [`ProjectVersionRef`]: crate::ident::ProjectVersionRef
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VersionSpec {
    /// Exactly one concrete version.
    Single(SingleVersion),
    /// A range or unresolved expression, kept verbatim.
    Variable(String),
}

impl VersionSpec {
    /// `true` if this spec names exactly one concrete version.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    /// The concrete version, if this spec is concrete.
    #[must_use]
    pub const fn as_single(&self) -> Option<&SingleVersion> {
        match self {
            Self::Single(v) => Some(v),
            Self::Variable(_) => None,
        }
    }

    /// The raw version text, concrete or not.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Single(v) => v.as_str(),
            Self::Variable(raw) => raw,
        }
    }
}

impl From<SingleVersion> for VersionSpec {
    fn from(v: SingleVersion) -> Self {
        Self::Single(v)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::{SingleVersion, VersionSpec};

    #[test]
    fn single_version_rejects_empty() {
        assert!(SingleVersion::new("").is_none());
        assert!(SingleVersion::new("   ").is_none());
        assert!(SingleVersion::new("1.0").is_some());
    }

    #[test]
    fn concrete_classification() {
        let single = VersionSpec::from(SingleVersion::new("1.0").expect("version"));
        assert!(single.is_concrete());
        assert_eq!(single.as_single().map(SingleVersion::as_str), Some("1.0"));

        let range = VersionSpec::Variable("[1.0,2.0)".to_string());
        assert!(!range.is_concrete());
        assert!(range.as_single().is_none());
        assert_eq!(range.raw(), "[1.0,2.0)");
    }

    #[test]
    fn display_shows_raw_text() {
        let spec = VersionSpec::Variable("${project.version}".to_string());
        assert_eq!(spec.to_string(), "${project.version}");
    }
}
