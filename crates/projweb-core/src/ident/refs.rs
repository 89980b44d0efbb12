//! Project coordinates at the three granularities the graph cares about.
//!
//! - [`ProjectRef`]: group + artifact, version-agnostic. Build order is
//!   expressed in these.
//! - [`ProjectVersionRef`]: adds a [`VersionSpec`]. This is vertex identity
//!   in the effective graph.
//! - [`ArtifactRef`]: adds type/classifier. Only ever the *target* of
//!   dependency-shaped edges; reduced to its [`ProjectVersionRef`] for
//!   vertex-identity purposes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::version::{SingleVersion, VersionSpec};

/// Version-agnostic group + artifact coordinate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    group_id: String,
    artifact_id: String,
}

impl ProjectRef {
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Attach a version spec, producing a versioned coordinate.
    #[must_use]
    pub fn with_version(&self, version: impl Into<VersionSpec>) -> ProjectVersionRef {
        ProjectVersionRef {
            project: self.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A versioned project coordinate — vertex identity in the effective graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectVersionRef {
    project: ProjectRef,
    version: VersionSpec,
}

impl ProjectVersionRef {
    #[must_use]
    pub fn new(project: ProjectRef, version: impl Into<VersionSpec>) -> Self {
        Self {
            project,
            version: version.into(),
        }
    }

    #[must_use]
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    #[must_use]
    pub fn version(&self) -> &VersionSpec {
        &self.version
    }

    /// `true` if the version spec is a single concrete version.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        self.version.is_concrete()
    }

    /// The unversioned group + artifact coordinate.
    #[must_use]
    pub fn unversioned(&self) -> ProjectRef {
        self.project.clone()
    }

    /// The same coordinate pinned to one concrete version.
    #[must_use]
    pub fn pinned_to(&self, version: SingleVersion) -> Self {
        Self {
            project: self.project.clone(),
            version: VersionSpec::Single(version),
        }
    }
}

impl fmt::Display for ProjectVersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.version)
    }
}

/// A concrete artifact coordinate: versioned project plus type/classifier.
///
/// Artifact identity is finer-grained than vertex identity. Two artifacts
/// of the same project (say `jar` and `test-jar`) are distinct edge
/// targets but the same graph vertex — use
/// [`ArtifactRef::project_version`] wherever vertex identity matters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    project: ProjectVersionRef,
    artifact_type: String,
    classifier: Option<String>,
}

impl ArtifactRef {
    #[must_use]
    pub fn new(
        project: ProjectVersionRef,
        artifact_type: impl Into<String>,
        classifier: Option<String>,
    ) -> Self {
        Self {
            project,
            artifact_type: artifact_type.into(),
            classifier,
        }
    }

    /// A plain `jar` artifact with no classifier — the common case.
    #[must_use]
    pub fn jar(project: ProjectVersionRef) -> Self {
        Self::new(project, "jar", None)
    }

    /// Reduce to the underlying versioned coordinate (vertex identity).
    #[must_use]
    pub const fn project_version(&self) -> &ProjectVersionRef {
        &self.project
    }

    #[must_use]
    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.artifact_type)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ArtifactRef, ProjectRef};
    use crate::ident::version::{SingleVersion, VersionSpec};

    fn version(raw: &str) -> SingleVersion {
        SingleVersion::new(raw).expect("concrete version")
    }

    #[test]
    fn display_formats() {
        let project = ProjectRef::new("org.example", "core");
        assert_eq!(project.to_string(), "org.example:core");

        let versioned = project.with_version(version("1.2"));
        assert_eq!(versioned.to_string(), "org.example:core:1.2");

        let artifact = ArtifactRef::new(versioned.clone(), "jar", Some("tests".to_string()));
        assert_eq!(artifact.to_string(), "org.example:core:1.2:jar:tests");
    }

    #[test]
    fn artifact_reduces_to_vertex_identity() {
        let versioned = ProjectRef::new("g", "a").with_version(version("1.0"));
        let jar = ArtifactRef::jar(versioned.clone());
        let test_jar = ArtifactRef::new(versioned.clone(), "test-jar", None);

        assert_ne!(jar, test_jar);
        assert_eq!(jar.project_version(), test_jar.project_version());
        assert_eq!(jar.project_version(), &versioned);
    }

    #[test]
    fn pinning_replaces_variable_version() {
        let variable = ProjectRef::new("g", "a")
            .with_version(VersionSpec::Variable("[1.0,2.0)".to_string()));
        assert!(!variable.is_concrete());

        let pinned = variable.pinned_to(version("1.5"));
        assert!(pinned.is_concrete());
        assert_eq!(pinned.project(), variable.project());
        assert_eq!(pinned.version().raw(), "1.5");
    }
}
