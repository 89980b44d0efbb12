//! The direct relationships of one project descriptor, bucketed by kind.
//!
//! A parser produces one [`DirectRelationships`] per descriptor it reads;
//! the effective graph ingests bundles via its builder. Declaration
//! indices are assigned here, per sibling bucket, in the order edges are
//! added — they are the deterministic listing order and the build-order
//! tie-break.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::key::ProjectKey;
use crate::ident::{ArtifactRef, ProjectRef, ProjectVersionRef};

use super::kind::DependencyScope;
use super::relationship::{Relationship, RelationshipError};

/// The direct (first-order) relationships declared by one project.
///
/// The parent edge is always present: when the descriptor declares no
/// parent, it is the placeholder self-parent sentinel. Filtered read paths
/// suppress the sentinel; it exists only so "parent of X" is total at the
/// storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectRelationships {
    key: ProjectKey,
    parent: Relationship,
    dependencies: Vec<Relationship>,
    managed_dependencies: Vec<Relationship>,
    plugins: Vec<Relationship>,
    managed_plugins: Vec<Relationship>,
    extensions: Vec<Relationship>,
    plugin_dependencies: BTreeMap<ProjectRef, Vec<Relationship>>,
}

impl DirectRelationships {
    #[must_use]
    pub fn builder(key: ProjectKey) -> DirectRelationshipsBuilder {
        DirectRelationshipsBuilder::new(key)
    }

    #[must_use]
    pub const fn key(&self) -> &ProjectKey {
        &self.key
    }

    /// The declaring project these relationships belong to.
    #[must_use]
    pub const fn project(&self) -> &ProjectVersionRef {
        self.key.project()
    }

    #[must_use]
    pub const fn parent(&self) -> &Relationship {
        &self.parent
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Relationship] {
        &self.dependencies
    }

    #[must_use]
    pub fn managed_dependencies(&self) -> &[Relationship] {
        &self.managed_dependencies
    }

    #[must_use]
    pub fn plugins(&self) -> &[Relationship] {
        &self.plugins
    }

    #[must_use]
    pub fn managed_plugins(&self) -> &[Relationship] {
        &self.managed_plugins
    }

    #[must_use]
    pub fn extensions(&self) -> &[Relationship] {
        &self.extensions
    }

    /// Plugin-level dependencies, keyed by the plugin they are scoped to.
    #[must_use]
    pub const fn plugin_dependencies(&self) -> &BTreeMap<ProjectRef, Vec<Relationship>> {
        &self.plugin_dependencies
    }

    /// Every edge of the bundle, placeholder parent included, in bucket
    /// then declaration order.
    #[must_use]
    pub fn exact_all(&self) -> Vec<Relationship> {
        let mut all = vec![self.parent.clone()];
        all.extend(self.dependencies.iter().cloned());
        all.extend(self.managed_dependencies.iter().cloned());
        all.extend(self.plugins.iter().cloned());
        all.extend(self.managed_plugins.iter().cloned());
        all.extend(self.extensions.iter().cloned());
        for rels in self.plugin_dependencies.values() {
            all.extend(rels.iter().cloned());
        }
        all
    }
}

/// Accumulates one project's direct relationships, assigning declaration
/// indices per bucket.
#[derive(Debug, Clone)]
pub struct DirectRelationshipsBuilder {
    key: ProjectKey,
    parent: Option<Relationship>,
    dependencies: Vec<Relationship>,
    managed_dependencies: Vec<Relationship>,
    plugins: Vec<Relationship>,
    managed_plugins: Vec<Relationship>,
    extensions: Vec<Relationship>,
    plugin_dependencies: BTreeMap<ProjectRef, Vec<Relationship>>,
}

impl DirectRelationshipsBuilder {
    #[must_use]
    pub fn new(key: ProjectKey) -> Self {
        Self {
            key,
            parent: None,
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            plugins: Vec::new(),
            managed_plugins: Vec::new(),
            extensions: Vec::new(),
            plugin_dependencies: BTreeMap::new(),
        }
    }

    /// Declare the parent project. Last call wins; parents are singular.
    #[must_use]
    pub fn with_parent(mut self, parent: ProjectVersionRef) -> Self {
        self.parent = Some(Relationship::parent(self.key.project().clone(), parent));
        self
    }

    /// Adopt an existing parent edge, re-owning it for this project when
    /// it was declared elsewhere (inherited parent).
    ///
    /// # Errors
    ///
    /// [`RelationshipError::ReownPlaceholder`] when the foreign edge is a
    /// placeholder self-parent.
    pub fn with_parent_relationship(
        mut self,
        parent: Relationship,
    ) -> Result<Self, RelationshipError> {
        let parent = if parent.declaring() == self.key.project() {
            parent
        } else {
            parent.reown(self.key.project().clone())?
        };
        self.parent = Some(parent);
        Ok(self)
    }

    #[must_use]
    pub fn with_dependency(
        mut self,
        target: ArtifactRef,
        scope: DependencyScope,
        excludes: BTreeSet<ProjectRef>,
    ) -> Self {
        let index = u32::try_from(self.dependencies.len()).unwrap_or(u32::MAX);
        self.dependencies.push(Relationship::dependency(
            self.key.project().clone(),
            target,
            scope,
            index,
            false,
            excludes,
        ));
        self
    }

    #[must_use]
    pub fn with_managed_dependency(
        mut self,
        target: ArtifactRef,
        scope: DependencyScope,
        excludes: BTreeSet<ProjectRef>,
    ) -> Self {
        let index = u32::try_from(self.managed_dependencies.len()).unwrap_or(u32::MAX);
        self.managed_dependencies.push(Relationship::dependency(
            self.key.project().clone(),
            target,
            scope,
            index,
            true,
            excludes,
        ));
        self
    }

    #[must_use]
    pub fn with_plugin(mut self, target: ProjectVersionRef) -> Self {
        let index = u32::try_from(self.plugins.len()).unwrap_or(u32::MAX);
        self.plugins.push(Relationship::plugin(
            self.key.project().clone(),
            target,
            index,
            false,
        ));
        self
    }

    #[must_use]
    pub fn with_managed_plugin(mut self, target: ProjectVersionRef) -> Self {
        let index = u32::try_from(self.managed_plugins.len()).unwrap_or(u32::MAX);
        self.managed_plugins.push(Relationship::plugin(
            self.key.project().clone(),
            target,
            index,
            true,
        ));
        self
    }

    #[must_use]
    pub fn with_extension(mut self, target: ProjectVersionRef) -> Self {
        let index = u32::try_from(self.extensions.len()).unwrap_or(u32::MAX);
        self.extensions.push(Relationship::extension(
            self.key.project().clone(),
            target,
            index,
        ));
        self
    }

    /// A dependency scoped to one plugin's execution.
    #[must_use]
    pub fn with_plugin_dependency(
        mut self,
        plugin: ProjectRef,
        target: ArtifactRef,
        managed: bool,
    ) -> Self {
        let bucket = self.plugin_dependencies.entry(plugin.clone()).or_default();
        let index = u32::try_from(bucket.len()).unwrap_or(u32::MAX);
        bucket.push(Relationship::plugin_dependency(
            self.key.project().clone(),
            plugin,
            target,
            index,
            managed,
        ));
        self
    }

    /// Finish the bundle, synthesizing the placeholder self-parent when no
    /// parent was declared.
    #[must_use]
    pub fn build(self) -> DirectRelationships {
        let parent = self
            .parent
            .unwrap_or_else(|| Relationship::placeholder_parent(self.key.project()));
        DirectRelationships {
            key: self.key,
            parent,
            dependencies: self.dependencies,
            managed_dependencies: self.managed_dependencies,
            plugins: self.plugins,
            managed_plugins: self.managed_plugins,
            extensions: self.extensions,
            plugin_dependencies: self.plugin_dependencies,
        }
    }
}
