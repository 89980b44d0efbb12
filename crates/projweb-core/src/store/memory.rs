//! In-memory reference implementation of the store contract.
//!
//! Everything lives behind one mutex. Good enough for tests, single
//! process tooling, and as the executable specification of the contract
//! the SQLite driver must match.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::ident::{ProjectRef, ProjectVersionRef, SingleVersion};
use crate::rel::Relationship;
use crate::workspace::{GraphView, Workspace, WorkspaceConfig};

use super::{GraphStore, StoreError};

#[derive(Debug, Default)]
struct SelectionSet {
    exact: BTreeMap<ProjectVersionRef, SingleVersion>,
    wildcard: BTreeMap<ProjectRef, SingleVersion>,
}

#[derive(Debug, Default)]
struct Inner {
    relationships: Vec<Relationship>,
    disconnected: BTreeSet<ProjectVersionRef>,
    metadata: BTreeMap<ProjectVersionRef, BTreeMap<String, String>>,
    workspaces: BTreeMap<String, Workspace>,
    selections: BTreeMap<String, SelectionSet>,
    next_workspace: u64,
}

impl Inner {
    /// Edge identity: declaring, target vertex, kind, declaration index.
    /// Payload differences (scope, excludes) do not make a new edge.
    fn holds(&self, rel: &Relationship) -> bool {
        self.relationships.iter().any(|r| {
            r.declaring() == rel.declaring()
                && r.target_project() == rel.target_project()
                && r.kind() == rel.kind()
                && r.index() == rel.index()
        })
    }

    fn has_outbound(&self, project: &ProjectVersionRef) -> bool {
        self.relationships
            .iter()
            .any(|r| r.declaring() == project)
    }

    fn is_known(&self, project: &ProjectVersionRef) -> bool {
        self.disconnected.contains(project)
            || self
                .relationships
                .iter()
                .any(|r| r.declaring() == project || r.target_project() == project)
    }

    fn known_projects(&self) -> BTreeSet<ProjectVersionRef> {
        let mut known: BTreeSet<ProjectVersionRef> = self.disconnected.iter().cloned().collect();
        for rel in &self.relationships {
            known.insert(rel.declaring().clone());
            known.insert(rel.target_project().clone());
        }
        known
    }

    /// Vertices reachable from the view's roots over view-accepted edges.
    /// `None` when the view has no root restriction.
    fn reachable(&self, view: &GraphView) -> Option<BTreeSet<ProjectVersionRef>> {
        if view.roots().is_empty() {
            return None;
        }
        let mut seen: BTreeSet<ProjectVersionRef> = view.roots().iter().cloned().collect();
        let mut frontier: Vec<ProjectVersionRef> = seen.iter().cloned().collect();
        while let Some(vertex) = frontier.pop() {
            for rel in &self.relationships {
                if rel.declaring() == &vertex && view.accepts(rel) {
                    let target = rel.target_project();
                    if seen.insert(target.clone()) {
                        frontier.push(target.clone());
                    }
                }
            }
        }
        Some(seen)
    }

    fn visible(&self, view: &GraphView, project: &ProjectVersionRef) -> bool {
        self.reachable(view).is_none_or(|set| set.contains(project))
    }
}

/// Mutex-guarded in-memory graph store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GraphStore for MemoryStore {
    fn add_relationships(
        &self,
        rels: &[Relationship],
    ) -> Result<Vec<Relationship>, StoreError> {
        let mut inner = self.lock();
        let mut added = Vec::new();
        for rel in rels {
            if !inner.holds(rel) {
                inner.relationships.push(rel.clone());
                added.push(rel.clone());
            }
        }
        debug!(offered = rels.len(), added = added.len(), "stored relationships");
        Ok(added)
    }

    fn add_disconnected_project(&self, project: &ProjectVersionRef) -> Result<(), StoreError> {
        self.lock().disconnected.insert(project.clone());
        Ok(())
    }

    fn relationships_declared_by(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, StoreError> {
        let inner = self.lock();
        let declared: Vec<Relationship> = inner
            .relationships
            .iter()
            .filter(|r| r.declaring() == project && view.accepts(r))
            .cloned()
            .collect();
        if declared.is_empty() && !inner.has_outbound(project) {
            // Unknown unless registered as a disconnected leaf.
            if inner.disconnected.contains(project) {
                return Ok(Some(Vec::new()));
            }
            return Ok(None);
        }
        Ok(Some(declared))
    }

    fn relationships_targeting(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, StoreError> {
        let inner = self.lock();
        if !inner.is_known(project) {
            return Ok(None);
        }
        Ok(Some(
            inner
                .relationships
                .iter()
                .filter(|r| r.target_project() == project && view.accepts(r))
                .cloned()
                .collect(),
        ))
    }

    fn all_relationships(
        &self,
        view: &GraphView,
    ) -> Result<Option<Vec<Relationship>>, StoreError> {
        let inner = self.lock();
        if inner.relationships.is_empty() && inner.disconnected.is_empty() {
            return Ok(None);
        }
        let reachable = inner.reachable(view);
        Ok(Some(
            inner
                .relationships
                .iter()
                .filter(|r| {
                    view.accepts(r)
                        && reachable
                            .as_ref()
                            .is_none_or(|set| set.contains(r.declaring()))
                })
                .cloned()
                .collect(),
        ))
    }

    fn contains_project(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<bool, StoreError> {
        let inner = self.lock();
        Ok(inner.is_known(project) && inner.visible(view, project))
    }

    fn is_missing(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<bool, StoreError> {
        let inner = self.lock();
        Ok(inner.is_known(project)
            && inner.visible(view, project)
            && !inner.has_outbound(project)
            && !inner.disconnected.contains(project))
    }

    fn all_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let inner = self.lock();
        let reachable = inner.reachable(view);
        Ok(inner
            .known_projects()
            .into_iter()
            .filter(|p| reachable.as_ref().is_none_or(|set| set.contains(p)))
            .collect())
    }

    fn missing_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let inner = self.lock();
        let reachable = inner.reachable(view);
        Ok(inner
            .known_projects()
            .into_iter()
            .filter(|p| {
                !inner.has_outbound(p)
                    && !inner.disconnected.contains(p)
                    && reachable.as_ref().is_none_or(|set| set.contains(p))
            })
            .collect())
    }

    fn variable_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let inner = self.lock();
        let reachable = inner.reachable(view);
        Ok(inner
            .known_projects()
            .into_iter()
            .filter(|p| {
                !p.is_concrete() && reachable.as_ref().is_none_or(|set| set.contains(p))
            })
            .collect())
    }

    fn projects_matching(
        &self,
        view: &GraphView,
        project: &ProjectRef,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let inner = self.lock();
        let reachable = inner.reachable(view);
        Ok(inner
            .known_projects()
            .into_iter()
            .filter(|p| {
                p.project() == project
                    && reachable.as_ref().is_none_or(|set| set.contains(p))
            })
            .collect())
    }

    fn metadata(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.lock().metadata.get(project).cloned().unwrap_or_default())
    }

    fn add_metadata(
        &self,
        project: &ProjectVersionRef,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.lock()
            .metadata
            .entry(project.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_metadata(
        &self,
        project: &ProjectVersionRef,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.lock().metadata.insert(project.clone(), metadata);
        Ok(())
    }

    fn projects_with_metadata(
        &self,
        view: &GraphView,
        key: &str,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let inner = self.lock();
        let reachable = inner.reachable(view);
        Ok(inner
            .metadata
            .iter()
            .filter(|(project, meta)| {
                meta.contains_key(key)
                    && reachable.as_ref().is_none_or(|set| set.contains(*project))
            })
            .map(|(project, _)| project.clone())
            .collect())
    }

    fn create_workspace(&self, config: WorkspaceConfig) -> Result<Workspace, StoreError> {
        let mut inner = self.lock();
        inner.next_workspace += 1;
        let id = format!("ws-{}", inner.next_workspace);
        let workspace = Workspace::new(id.clone(), config);
        inner.workspaces.insert(id.clone(), workspace.clone());
        debug!(%id, "created workspace");
        Ok(workspace)
    }

    fn load_workspace(&self, id: &str) -> Result<Option<Workspace>, StoreError> {
        let inner = self.lock();
        let Some(mut workspace) = inner.workspaces.get(id).cloned() else {
            return Ok(None);
        };
        // Durable pins live in the selection map; overlay them so a
        // reload observes selections committed since the last flush.
        if let Some(set) = inner.selections.get(id) {
            for (target, version) in &set.exact {
                workspace.select_version(target.clone(), version.clone());
            }
            for (target, version) in &set.wildcard {
                workspace.select_version_for_all(target.clone(), version.clone());
            }
        }
        Ok(Some(workspace))
    }

    fn store_workspace(&self, workspace: &Workspace) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.workspaces.contains_key(workspace.id()) {
            return Err(StoreError::WorkspaceNotFound(workspace.id().to_string()));
        }
        inner
            .workspaces
            .insert(workspace.id().to_string(), workspace.clone());
        Ok(())
    }

    fn delete_workspace(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        inner.selections.remove(id);
        Ok(inner.workspaces.remove(id).is_some())
    }

    fn all_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        Ok(self.lock().workspaces.values().cloned().collect())
    }

    fn select_version(
        &self,
        workspace_id: &str,
        project: &ProjectVersionRef,
        version: &SingleVersion,
    ) -> Result<(), StoreError> {
        self.lock()
            .selections
            .entry(workspace_id.to_string())
            .or_default()
            .exact
            .insert(project.clone(), version.clone());
        Ok(())
    }

    fn select_version_for_all(
        &self,
        workspace_id: &str,
        project: &ProjectRef,
        version: &SingleVersion,
    ) -> Result<(), StoreError> {
        self.lock()
            .selections
            .entry(workspace_id.to_string())
            .or_default()
            .wildcard
            .insert(project.clone(), version.clone());
        Ok(())
    }

    fn clear_selected_versions(&self, workspace_id: &str) -> Result<(), StoreError> {
        self.lock().selections.remove(workspace_id);
        Ok(())
    }
}
