//! Front door over a shared store: graphs, workspaces, selections,
//! metadata.
//!
//! # Overview
//!
//! A [`GraphManager`] wraps one [`GraphStore`] and hands out
//! workspace-scoped [`EffectiveGraph`]s over it. It owns no graph state
//! itself; everything it returns is a live view against the store, so two
//! managers over the same store agree.

// Every method fails the same way: a store failure wrapped in GraphError.
#![allow(clippy::missing_errors_doc)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::filter::RelationshipFilter;
use crate::graph::{EffectiveGraph, GraphBuilder, GraphError, GraphFacts, ProjectKey};
use crate::ident::{ProjectRef, ProjectVersionRef, SingleVersion};
use crate::rel::{DirectRelationships, Relationship};
use crate::store::GraphStore;
use crate::workspace::{GraphView, Workspace, WorkspaceConfig};

/// Workspace-aware access to every graph in a store.
pub struct GraphManager {
    store: Arc<dyn GraphStore>,
}

impl GraphManager {
    #[must_use]
    pub const fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    fn view(
        &self,
        workspace: Option<&Workspace>,
        filter: Option<RelationshipFilter>,
        root: Option<&ProjectVersionRef>,
    ) -> GraphView {
        let mut view = workspace.map_or_else(GraphView::global, GraphView::for_workspace);
        if let Some(filter) = filter {
            view = view.with_filter(filter);
        }
        if let Some(root) = root {
            view = view.with_roots([root.clone()]);
        }
        view
    }

    // -- graphs ------------------------------------------------------------

    /// Persist loose edges without going through a graph.
    pub fn store_relationships(
        &self,
        rels: &[Relationship],
    ) -> Result<Vec<Relationship>, GraphError> {
        Ok(self.store.add_relationships(rels)?)
    }

    /// Materialize a new graph from a root project's declared
    /// relationships, under a workspace's profile facts.
    pub fn create_graph(
        &self,
        workspace: &Workspace,
        bundle: &DirectRelationships,
    ) -> Result<EffectiveGraph, GraphError> {
        let view = self.view(Some(workspace), None, Some(bundle.project()));
        info!(root = %bundle.key(), workspace = workspace.id(), "creating graph");
        GraphBuilder::from_bundle(Arc::clone(&self.store), view, bundle).build()
    }

    /// Open the graph rooted at `project`, if the store holds one.
    /// `Ok(None)` when the project is unknown or only referenced (its own
    /// relationships never recorded).
    pub fn get_graph(
        &self,
        workspace: Option<&Workspace>,
        filter: Option<RelationshipFilter>,
        project: &ProjectVersionRef,
    ) -> Result<Option<EffectiveGraph>, GraphError> {
        let view = self.view(workspace, filter, Some(project));
        if !self.store.contains_project(&view, project)?
            || self.store.is_missing(&view, project)?
        {
            return Ok(None);
        }

        let facts = workspace.map_or_else(GraphFacts::default, |ws| {
            GraphFacts::new(ws.config().active_profiles.iter().cloned())
        });
        let key = ProjectKey::new(project.clone(), facts);
        EffectiveGraph::open(Arc::clone(&self.store), view, key).map(Some)
    }

    /// Like [`Self::get_graph`], but the graph's absence is an error.
    pub fn require_graph(
        &self,
        workspace: Option<&Workspace>,
        filter: Option<RelationshipFilter>,
        project: &ProjectVersionRef,
    ) -> Result<EffectiveGraph, GraphError> {
        self.get_graph(workspace, filter, project)?
            .ok_or_else(|| GraphError::NoSuchGraph(project.clone()))
    }

    /// Whether the store holds a graph rooted at `project` (known and not
    /// merely referenced).
    pub fn contains_graph(
        &self,
        workspace: Option<&Workspace>,
        project: &ProjectVersionRef,
    ) -> Result<bool, GraphError> {
        let view = self.view(workspace, None, Some(project));
        Ok(self.store.contains_project(&view, project)?
            && !self.store.is_missing(&view, project)?)
    }

    /// Register a vertex known to have no relationships at all, so it
    /// stops reading as incomplete.
    pub fn add_disconnected_project(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<(), GraphError> {
        Ok(self.store.add_disconnected_project(project)?)
    }

    /// Every stored version of a group+artifact coordinate.
    pub fn projects_matching(
        &self,
        workspace: Option<&Workspace>,
        project: &ProjectRef,
    ) -> Result<BTreeSet<ProjectVersionRef>, GraphError> {
        let view = self.view(workspace, None, None);
        Ok(self.store.projects_matching(&view, project)?)
    }

    // -- workspaces --------------------------------------------------------

    /// Create a durable workspace.
    pub fn create_workspace(&self, config: WorkspaceConfig) -> Result<Workspace, GraphError> {
        Ok(self.store.create_workspace(config)?)
    }

    /// Create a workspace deleted again when closed.
    pub fn create_temporary_workspace(
        &self,
        config: WorkspaceConfig,
    ) -> Result<Workspace, GraphError> {
        let mut workspace = self.store.create_workspace(config)?;
        workspace.mark_temporary();
        self.store.store_workspace(&workspace)?;
        Ok(workspace)
    }

    pub fn load_workspace(&self, id: &str) -> Result<Option<Workspace>, GraphError> {
        Ok(self.store.load_workspace(id)?)
    }

    /// Flush a workspace's current state without closing it.
    pub fn store_workspace(&self, workspace: &Workspace) -> Result<(), GraphError> {
        Ok(self.store.store_workspace(workspace)?)
    }

    /// Flush a durable workspace, or delete a temporary one.
    pub fn close_workspace(&self, workspace: Workspace) -> Result<(), GraphError> {
        if workspace.is_temporary() {
            debug!(id = workspace.id(), "deleting temporary workspace");
            self.store.delete_workspace(workspace.id())?;
        } else {
            self.store.store_workspace(&workspace)?;
        }
        Ok(())
    }

    /// Delete a workspace outright. Returns `false` when the id was
    /// unknown.
    pub fn delete_workspace(&self, id: &str) -> Result<bool, GraphError> {
        Ok(self.store.delete_workspace(id)?)
    }

    pub fn all_workspaces(&self) -> Result<Vec<Workspace>, GraphError> {
        Ok(self.store.all_workspaces()?)
    }

    // -- version selections ------------------------------------------------

    /// Pin one exact coordinate in a workspace, durably.
    pub fn select_version(
        &self,
        workspace: &mut Workspace,
        target: ProjectVersionRef,
        version: SingleVersion,
    ) -> Result<(), GraphError> {
        self.store
            .select_version(workspace.id(), &target, &version)?;
        workspace.select_version(target, version);
        Ok(())
    }

    /// Pin every version of a coordinate in a workspace, durably.
    pub fn select_version_for_all(
        &self,
        workspace: &mut Workspace,
        target: ProjectRef,
        version: SingleVersion,
    ) -> Result<(), GraphError> {
        self.store
            .select_version_for_all(workspace.id(), &target, &version)?;
        workspace.select_version_for_all(target, version);
        Ok(())
    }

    /// Drop every pin in a workspace, durably.
    pub fn clear_selections(&self, workspace: &mut Workspace) -> Result<(), GraphError> {
        self.store.clear_selected_versions(workspace.id())?;
        workspace.clear_selections();
        Ok(())
    }

    // -- metadata ----------------------------------------------------------

    pub fn metadata(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<BTreeMap<String, String>, GraphError> {
        Ok(self.store.metadata(project)?)
    }

    pub fn add_metadata(
        &self,
        project: &ProjectVersionRef,
        key: &str,
        value: &str,
    ) -> Result<(), GraphError> {
        Ok(self.store.add_metadata(project, key, value)?)
    }

    pub fn set_metadata(
        &self,
        project: &ProjectVersionRef,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), GraphError> {
        Ok(self.store.set_metadata(project, metadata)?)
    }

    pub fn projects_with_metadata(
        &self,
        workspace: Option<&Workspace>,
        key: &str,
    ) -> Result<BTreeSet<ProjectVersionRef>, GraphError> {
        let view = self.view(workspace, None, None);
        Ok(self.store.projects_with_metadata(&view, key)?)
    }
}

impl std::fmt::Debug for GraphManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::GraphManager;
    use crate::graph::ProjectKey;
    use crate::ident::{ArtifactRef, ProjectRef, ProjectVersionRef, SingleVersion};
    use crate::rel::{DependencyScope, DirectRelationships};
    use crate::store::MemoryStore;
    use crate::workspace::WorkspaceConfig;

    fn manager() -> GraphManager {
        GraphManager::new(Arc::new(MemoryStore::new()))
    }

    fn pvr(artifact: &str) -> ProjectVersionRef {
        ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
    }

    fn bundle(root: &str, dep: &str) -> DirectRelationships {
        DirectRelationships::builder(ProjectKey::plain(pvr(root)))
            .with_dependency(
                ArtifactRef::jar(pvr(dep)),
                DependencyScope::Compile,
                BTreeSet::new(),
            )
            .build()
    }

    #[test]
    fn get_graph_is_none_for_unknown_and_referenced_only_projects() {
        let m = manager();
        let ws = m.create_workspace(WorkspaceConfig::default()).expect("ws");
        m.create_graph(&ws, &bundle("root", "lib")).expect("create");

        assert!(m.get_graph(None, None, &pvr("ghost")).expect("get").is_none());
        // "lib" is referenced but never declared anything.
        assert!(m.get_graph(None, None, &pvr("lib")).expect("get").is_none());
        assert!(m.get_graph(None, None, &pvr("root")).expect("get").is_some());

        assert!(m.contains_graph(None, &pvr("root")).expect("contains"));
        assert!(!m.contains_graph(None, &pvr("lib")).expect("contains"));

        let missing = m.require_graph(None, None, &pvr("ghost"));
        assert!(matches!(
            missing,
            Err(crate::graph::GraphError::NoSuchGraph(p)) if p == pvr("ghost")
        ));
    }

    #[test]
    fn temporary_workspace_is_deleted_on_close() {
        let m = manager();
        let tmp = m
            .create_temporary_workspace(WorkspaceConfig::default())
            .expect("ws");
        let id = tmp.id().to_string();
        assert!(m.load_workspace(&id).expect("load").is_some());

        m.close_workspace(tmp).expect("close");
        assert!(m.load_workspace(&id).expect("load").is_none());
    }

    #[test]
    fn durable_workspace_is_flushed_on_close() {
        let m = manager();
        let mut ws = m.create_workspace(WorkspaceConfig::default()).expect("ws");
        let id = ws.id().to_string();
        m.select_version(&mut ws, pvr("lib"), SingleVersion::new("2").expect("v"))
            .expect("select");
        m.close_workspace(ws).expect("close");

        let mut reloaded = m.load_workspace(&id).expect("load").expect("found");
        assert_eq!(
            reloaded.resolve_version(&pvr("lib")).version().raw(),
            "2"
        );
    }

    #[test]
    fn selection_survives_reload_without_close() {
        let m = manager();
        let mut ws = m.create_workspace(WorkspaceConfig::default()).expect("ws");
        m.select_version(&mut ws, pvr("lib"), SingleVersion::new("2").expect("v"))
            .expect("select");

        // The select call is the durability commit point; no flush ran.
        let mut reloaded = m.load_workspace(ws.id()).expect("load").expect("found");
        assert_eq!(reloaded.resolve_version(&pvr("lib")).version().raw(), "2");
    }

    #[test]
    fn selections_are_isolated_per_workspace() {
        let m = manager();
        let mut one = m.create_workspace(WorkspaceConfig::default()).expect("ws");
        let mut two = m.create_workspace(WorkspaceConfig::default()).expect("ws");

        m.select_version(&mut one, pvr("lib"), SingleVersion::new("9").expect("v"))
            .expect("select");
        assert_eq!(one.resolve_version(&pvr("lib")).version().raw(), "9");
        assert_eq!(two.resolve_version(&pvr("lib")), pvr("lib"));

        m.clear_selections(&mut one).expect("clear");
        assert_eq!(one.resolve_version(&pvr("lib")), pvr("lib"));
        // Untouched by the clear.
        assert_eq!(two.resolve_version(&pvr("lib")), pvr("lib"));
    }

    #[test]
    fn projects_matching_sees_every_version() {
        let m = manager();
        let ws = m.create_workspace(WorkspaceConfig::default()).expect("ws");
        m.create_graph(&ws, &bundle("root", "lib")).expect("create");

        let two = ProjectRef::new("g", "root")
            .with_version(SingleVersion::new("2").expect("v"));
        let bundle_v2 = DirectRelationships::builder(ProjectKey::plain(two.clone()))
            .with_dependency(
                ArtifactRef::jar(pvr("lib")),
                DependencyScope::Compile,
                BTreeSet::new(),
            )
            .build();
        m.create_graph(&ws, &bundle_v2).expect("create");

        let matches = m
            .projects_matching(None, &ProjectRef::new("g", "root"))
            .expect("match");
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&pvr("root")));
        assert!(matches.contains(&two));
    }
}
