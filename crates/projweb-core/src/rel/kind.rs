//! Relationship kinds and dependency scopes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The seven typed edge kinds of the project graph.
///
/// The managed flag is folded into the kind: a managed dependency and a
/// concrete dependency with otherwise identical coordinates are distinct
/// edges with distinct kinds. Filters restrict on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Parent,
    Dependency,
    ManagedDependency,
    Plugin,
    ManagedPlugin,
    Extension,
    PluginDependency,
}

impl RelationshipKind {
    /// All kinds, in declaration-bucket order.
    pub const ALL: [Self; 7] = [
        Self::Parent,
        Self::Dependency,
        Self::ManagedDependency,
        Self::Plugin,
        Self::ManagedPlugin,
        Self::Extension,
        Self::PluginDependency,
    ];

    /// `true` for the managed (declared-but-not-materialized) kinds.
    #[must_use]
    pub const fn is_managed(self) -> bool {
        matches!(self, Self::ManagedDependency | Self::ManagedPlugin)
    }

    /// `true` for kinds whose target is an artifact rather than a plain
    /// project coordinate.
    #[must_use]
    pub const fn targets_artifact(self) -> bool {
        matches!(
            self,
            Self::Dependency | Self::ManagedDependency | Self::PluginDependency
        )
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parent => "parent",
            Self::Dependency => "dependency",
            Self::ManagedDependency => "managed-dependency",
            Self::Plugin => "plugin",
            Self::ManagedPlugin => "managed-plugin",
            Self::Extension => "extension",
            Self::PluginDependency => "plugin-dependency",
        };
        f.write_str(name)
    }
}

/// Scope of a dependency edge. Defaults to [`DependencyScope::Compile`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DependencyScope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl DependencyScope {
    /// Scopes that remain in effect one dependency hop further out.
    ///
    /// `test`/`provided` dependencies matter only to the project that
    /// declares them; `compile`/`runtime` flow through transitively.
    #[must_use]
    pub const fn is_transitive(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compile => "compile",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{DependencyScope, RelationshipKind};

    #[test]
    fn managed_kinds() {
        assert!(RelationshipKind::ManagedDependency.is_managed());
        assert!(RelationshipKind::ManagedPlugin.is_managed());
        assert!(!RelationshipKind::Dependency.is_managed());
        assert!(!RelationshipKind::Parent.is_managed());
    }

    #[test]
    fn artifact_targeted_kinds() {
        assert!(RelationshipKind::Dependency.targets_artifact());
        assert!(RelationshipKind::ManagedDependency.targets_artifact());
        assert!(RelationshipKind::PluginDependency.targets_artifact());
        assert!(!RelationshipKind::Plugin.targets_artifact());
        assert!(!RelationshipKind::Parent.targets_artifact());
    }

    #[test]
    fn transitive_scopes() {
        assert!(DependencyScope::Compile.is_transitive());
        assert!(DependencyScope::Runtime.is_transitive());
        assert!(!DependencyScope::Test.is_transitive());
        assert!(!DependencyScope::Provided.is_transitive());
    }

    #[test]
    fn default_scope_is_compile() {
        assert_eq!(DependencyScope::default(), DependencyScope::Compile);
    }
}
