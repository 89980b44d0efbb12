//! The typed, declaration-ordered graph edge.
//!
//! # Overview
//!
//! A [`Relationship`] links a declaring project to a target coordinate.
//! Kind-specific fields live in a tagged payload ([`RelationshipData`])
//! rather than a subtype per kind — every site that branches on kind does
//! so with an exhaustive `match`.
//!
//! # Identity
//!
//! Edge identity is `(declaring, target, kind, index)`, where the kind
//! already folds in the managed flag. Scope and exclusions are payload:
//! two dependency edges that differ only in scope are the *same* edge for
//! deduplication purposes. `PartialEq`/`Hash` implement exactly this.
//!
//! # Placeholder parents
//!
//! "No parent declared" is materialized, at the storage boundary only, as
//! a self-referential parent edge. Every filtered read path suppresses
//! these; [`Relationship::reown`] refuses to re-declare one.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ident::{ArtifactRef, ProjectRef, ProjectVersionRef};

use super::kind::{DependencyScope, RelationshipKind};

/// Errors rejected at edge-construction time. A malformed edge is never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelationshipError {
    /// The target's shape is invalid for the edge kind (e.g. a plain
    /// project target on a dependency edge).
    #[error("{kind} relationship requires {expected} target, got {got}")]
    InvalidTarget {
        kind: RelationshipKind,
        expected: &'static str,
        got: &'static str,
    },

    /// A placeholder self-parent edge cannot be re-declared for another
    /// project — that would fabricate a second placeholder.
    #[error("cannot re-own placeholder parent edge of {0}")]
    ReownPlaceholder(ProjectVersionRef),
}

/// The target of an edge: a plain project coordinate, or an artifact for
/// dependency-shaped kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Target {
    Project(ProjectVersionRef),
    Artifact(ArtifactRef),
}

impl Target {
    /// The target's vertex identity (artifacts reduce to their project).
    #[must_use]
    pub const fn project_version(&self) -> &ProjectVersionRef {
        match self {
            Self::Project(p) => p,
            Self::Artifact(a) => a.project_version(),
        }
    }

    const fn shape(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Artifact(_) => "artifact",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(p) => p.fmt(f),
            Self::Artifact(a) => a.fmt(f),
        }
    }
}

/// Kind-specific edge payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipData {
    Parent,
    Dependency {
        scope: DependencyScope,
        managed: bool,
        /// Transitive subgraphs the declaring project excludes below this
        /// dependency.
        excludes: BTreeSet<ProjectRef>,
    },
    Plugin {
        managed: bool,
    },
    PluginDependency {
        /// The plugin whose execution this dependency is scoped to.
        plugin: ProjectRef,
        managed: bool,
    },
    Extension,
}

impl RelationshipData {
    /// The edge kind, with the managed flag folded in.
    #[must_use]
    pub const fn kind(&self) -> RelationshipKind {
        match self {
            Self::Parent => RelationshipKind::Parent,
            Self::Dependency { managed: false, .. } => RelationshipKind::Dependency,
            Self::Dependency { managed: true, .. } => RelationshipKind::ManagedDependency,
            Self::Plugin { managed: false } => RelationshipKind::Plugin,
            Self::Plugin { managed: true } => RelationshipKind::ManagedPlugin,
            Self::Extension => RelationshipKind::Extension,
            Self::PluginDependency { .. } => RelationshipKind::PluginDependency,
        }
    }
}

/// One immutable, typed, declaration-ordered edge of the project graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    declaring: ProjectVersionRef,
    target: Target,
    /// Sibling order among edges of the same (declaring, kind). Stable;
    /// the build-order tie-break.
    index: u32,
    data: RelationshipData,
}

impl Relationship {
    /// Construct an edge, validating that the target shape matches the
    /// kind. Dependency-shaped kinds require an artifact target, all
    /// others a plain project target.
    ///
    /// # Errors
    ///
    /// [`RelationshipError::InvalidTarget`] on a shape mismatch.
    pub fn new(
        declaring: ProjectVersionRef,
        target: Target,
        index: u32,
        data: RelationshipData,
    ) -> Result<Self, RelationshipError> {
        let kind = data.kind();
        let wants_artifact = kind.targets_artifact();
        let is_artifact = matches!(target, Target::Artifact(_));
        if wants_artifact != is_artifact {
            return Err(RelationshipError::InvalidTarget {
                kind,
                expected: if wants_artifact { "artifact" } else { "project" },
                got: target.shape(),
            });
        }
        Ok(Self {
            declaring,
            target,
            index,
            data,
        })
    }

    /// A parent edge. Parents are singular, so the index is always 0.
    #[must_use]
    pub const fn parent(declaring: ProjectVersionRef, parent: ProjectVersionRef) -> Self {
        Self {
            declaring,
            target: Target::Project(parent),
            index: 0,
            data: RelationshipData::Parent,
        }
    }

    /// The self-referential sentinel recorded when a project declares no
    /// parent.
    #[must_use]
    pub fn placeholder_parent(project: &ProjectVersionRef) -> Self {
        Self::parent(project.clone(), project.clone())
    }

    /// A dependency edge (managed or concrete).
    #[must_use]
    pub const fn dependency(
        declaring: ProjectVersionRef,
        target: ArtifactRef,
        scope: DependencyScope,
        index: u32,
        managed: bool,
        excludes: BTreeSet<ProjectRef>,
    ) -> Self {
        Self {
            declaring,
            target: Target::Artifact(target),
            index,
            data: RelationshipData::Dependency {
                scope,
                managed,
                excludes,
            },
        }
    }

    /// A plugin edge (managed or concrete).
    #[must_use]
    pub const fn plugin(
        declaring: ProjectVersionRef,
        target: ProjectVersionRef,
        index: u32,
        managed: bool,
    ) -> Self {
        Self {
            declaring,
            target: Target::Project(target),
            index,
            data: RelationshipData::Plugin { managed },
        }
    }

    /// A dependency scoped to one plugin's execution.
    #[must_use]
    pub const fn plugin_dependency(
        declaring: ProjectVersionRef,
        plugin: ProjectRef,
        target: ArtifactRef,
        index: u32,
        managed: bool,
    ) -> Self {
        Self {
            declaring,
            target: Target::Artifact(target),
            index,
            data: RelationshipData::PluginDependency { plugin, managed },
        }
    }

    /// A build-extension edge.
    #[must_use]
    pub const fn extension(
        declaring: ProjectVersionRef,
        target: ProjectVersionRef,
        index: u32,
    ) -> Self {
        Self {
            declaring,
            target: Target::Project(target),
            index,
            data: RelationshipData::Extension,
        }
    }

    #[must_use]
    pub const fn declaring(&self) -> &ProjectVersionRef {
        &self.declaring
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// The target's vertex identity, artifact targets reduced.
    #[must_use]
    pub const fn target_project(&self) -> &ProjectVersionRef {
        self.target.project_version()
    }

    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn data(&self) -> &RelationshipData {
        &self.data
    }

    #[must_use]
    pub const fn kind(&self) -> RelationshipKind {
        self.data.kind()
    }

    #[must_use]
    pub const fn is_managed(&self) -> bool {
        self.kind().is_managed()
    }

    /// Dependency scope, for dependency edges.
    #[must_use]
    pub const fn scope(&self) -> Option<DependencyScope> {
        match &self.data {
            RelationshipData::Dependency { scope, .. } => Some(*scope),
            _ => None,
        }
    }

    /// Exclusions declared on a dependency edge.
    #[must_use]
    pub const fn excludes(&self) -> Option<&BTreeSet<ProjectRef>> {
        match &self.data {
            RelationshipData::Dependency { excludes, .. } => Some(excludes),
            _ => None,
        }
    }

    /// `true` for the self-referential no-parent sentinel.
    #[must_use]
    pub fn is_placeholder_parent(&self) -> bool {
        self.kind() == RelationshipKind::Parent && self.declaring == *self.target_project()
    }

    /// Re-declare this edge for a different declaring project, keeping
    /// target, kind, payload, and index. Used when an inherited edge must
    /// be re-owned by a descendant.
    ///
    /// # Errors
    ///
    /// [`RelationshipError::ReownPlaceholder`] for a placeholder
    /// self-parent edge — re-owning one would fabricate a second
    /// placeholder.
    pub fn reown(&self, new_declaring: ProjectVersionRef) -> Result<Self, RelationshipError> {
        if self.is_placeholder_parent() {
            return Err(RelationshipError::ReownPlaceholder(self.declaring.clone()));
        }
        Ok(Self {
            declaring: new_declaring,
            target: self.target.clone(),
            index: self.index,
            data: self.data.clone(),
        })
    }
}

// Identity is (declaring, target, kind, index). Payload fields beyond the
// managed flag (scope, excludes, owning plugin version) deliberately do
// not participate.
impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring
            && self.target == other.target
            && self.kind() == other.kind()
            && self.index == other.index
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring.hash(state);
        self.target.hash(state);
        self.kind().hash(state);
        self.index.hash(state);
    }
}

// One line; used in cycle reports and logs.
impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -{}-> {} [{}]",
            self.declaring,
            self.kind(),
            self.target,
            self.index
        )
    }
}
