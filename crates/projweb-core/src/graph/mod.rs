//! The incremental effective graph.
//!
//! # Overview
//!
//! An [`EffectiveGraph`] is a mutable, queryable container over one
//! project's relationship web, identified by a [`ProjectKey`] (root
//! coordinate + build facts). It maintains three derived vertex sets as
//! edges arrive:
//!
//! - **connected**: vertices whose outbound edges have been recorded,
//! - **incomplete**: vertices referenced as targets whose outbound edges
//!   are still unknown,
//! - **variable**: vertices referenced with a non-concrete version spec.
//!
//! All three are updated in the same critical section as the edge
//! insertion, so no query observes an edge without its classification
//! side effects. Durability is delegated to the backing [`GraphStore`];
//! the store call happens after the in-memory update, so a store failure
//! leaves memory ahead of the store, never behind.
//!
//! Cycles are first-class values: recorded once, appended, never removed.
//! Cycle members count as connected even though traversal refuses to
//! revisit them.

// Mutations and reads fail the same way: a store failure wrapped in
// GraphError.
#![allow(clippy::missing_errors_doc)]
// The derived-set guard must span the store call: classification and
// durability commit share one critical section.
#![allow(clippy::significant_drop_tightening)]

pub mod builder;
pub mod key;

pub use builder::GraphBuilder;
pub use key::{GraphFacts, ProjectKey};

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::ident::ProjectVersionRef;
use crate::rel::{Cycle, Relationship, RelationshipKind};
use crate::store::{GraphStore, StoreError};
use crate::workspace::GraphView;

/// Failures surfaced by graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no graph stored for {0}")]
    NoSuchGraph(ProjectVersionRef),
}

#[derive(Debug, Default)]
struct DerivedSets {
    connected: BTreeSet<ProjectVersionRef>,
    incomplete: BTreeSet<ProjectVersionRef>,
    variable: BTreeSet<ProjectVersionRef>,
}

impl DerivedSets {
    /// Classification update for one new edge. Declaring becomes
    /// connected; the target joins incomplete or variable unless already
    /// accounted for.
    fn absorb(&mut self, rel: &Relationship) {
        self.incomplete.remove(rel.declaring());
        self.connected.insert(rel.declaring().clone());

        let target = rel.target_project();
        if !target.is_concrete() {
            self.variable.insert(target.clone());
        } else if !self.connected.contains(target) {
            self.incomplete.insert(target.clone());
        }
    }
}

/// One project's effective dependency graph, live against a store.
pub struct EffectiveGraph {
    key: ProjectKey,
    view: GraphView,
    store: Arc<dyn GraphStore>,
    derived: Mutex<DerivedSets>,
    cycles: Mutex<Vec<Cycle>>,
}

impl EffectiveGraph {
    /// Open the graph for `key` under `view`, seeding the derived sets
    /// from whatever the store already holds.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn open(
        store: Arc<dyn GraphStore>,
        view: GraphView,
        key: ProjectKey,
    ) -> Result<Self, GraphError> {
        let mut incomplete = store.missing_projects(&view)?;
        // Variable vertices are classified separately, never as
        // incomplete.
        incomplete.retain(ProjectVersionRef::is_concrete);
        let mut derived = DerivedSets {
            connected: BTreeSet::new(),
            incomplete,
            variable: store.variable_projects(&view)?,
        };
        // The root is connected by definition; if the store only knows it
        // as a target so far, it must not stay classified incomplete.
        derived.connected.insert(key.project().clone());
        derived.incomplete.remove(key.project());
        if let Some(rels) = store.all_relationships(&view)? {
            for rel in &rels {
                derived.connected.insert(rel.declaring().clone());
                derived.incomplete.remove(rel.declaring());
            }
        }

        Ok(Self {
            key,
            view,
            store,
            derived: Mutex::new(derived),
            cycles: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub const fn key(&self) -> &ProjectKey {
        &self.key
    }

    /// The root coordinate this graph was materialized for.
    #[must_use]
    pub const fn root(&self) -> &ProjectVersionRef {
        self.key.project()
    }

    #[must_use]
    pub const fn view(&self) -> &GraphView {
        &self.view
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    fn derived(&self) -> MutexGuard<'_, DerivedSets> {
        self.derived.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cycle_list(&self) -> MutexGuard<'_, Vec<Cycle>> {
        self.cycles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- mutation ----------------------------------------------------------

    /// Record one edge. Returns `true` when the edge was new to the store.
    ///
    /// The derived-set update and the store insert share one critical
    /// section; if the store fails, memory is ahead of it and the error
    /// propagates.
    pub fn add_relationship(&self, rel: &Relationship) -> Result<bool, GraphError> {
        let mut derived = self.derived();
        derived.absorb(rel);
        trace!(%rel, "recorded relationship");
        let added = self.store.add_relationships(std::slice::from_ref(rel))?;
        Ok(!added.is_empty())
    }

    /// Record a batch of edges, then re-examine the incomplete set against
    /// the store: a vertex whose outbound edges became known elsewhere
    /// (through a shared store) stops being incomplete. Returns the edges
    /// that were new to the store.
    pub fn add_all(&self, rels: &[Relationship]) -> Result<Vec<Relationship>, GraphError> {
        let mut derived = self.derived();
        for rel in rels {
            derived.absorb(rel);
        }
        let added = self.store.add_relationships(rels)?;
        debug!(offered = rels.len(), added = added.len(), root = %self.key, "extended graph");

        self.reconcile_incomplete(&mut derived)?;
        Ok(added)
    }

    /// Splice another graph into this one: its edges are added here and
    /// its connected vertices stop being incomplete. Cycles recorded there
    /// are carried over.
    pub fn connect(&self, other: &Self) -> Result<(), GraphError> {
        let edges = other
            .store
            .all_relationships(&other.view)?
            .unwrap_or_default();
        self.add_all(&edges)?;

        {
            let mut derived = self.derived();
            for project in other.connected_projects() {
                derived.incomplete.remove(&project);
                derived.connected.insert(project);
            }
        }
        for cycle in other.cycles() {
            self.record_cycle(cycle)?;
        }
        Ok(())
    }

    /// Drop vertices from the incomplete set whose outbound edges the
    /// store now knows.
    fn reconcile_incomplete(&self, derived: &mut DerivedSets) -> Result<(), GraphError> {
        let candidates: Vec<ProjectVersionRef> = derived.incomplete.iter().cloned().collect();
        for project in candidates {
            if self
                .store
                .relationships_declared_by(&self.view, &project)?
                .is_some()
            {
                derived.incomplete.remove(&project);
                derived.connected.insert(project);
            }
        }
        Ok(())
    }

    /// Record a cycle. Its edges are stored, its members become connected,
    /// and the cycle value itself is appended (once) to the cycle list.
    pub fn record_cycle(&self, cycle: Cycle) -> Result<(), GraphError> {
        self.store.add_relationships(cycle.relationships())?;
        {
            let mut derived = self.derived();
            for rel in cycle.relationships() {
                derived.absorb(rel);
            }
            for project in cycle.projects() {
                derived.incomplete.remove(project);
                derived.connected.insert(project.clone());
            }
        }

        let mut cycles = self.cycle_list();
        if !cycles.contains(&cycle) {
            debug!(%cycle, root = %self.key, "recorded cycle");
            cycles.push(cycle);
        }
        Ok(())
    }

    // -- cycles ------------------------------------------------------------

    /// Snapshot of the recorded cycles.
    #[must_use]
    pub fn cycles(&self) -> Vec<Cycle> {
        self.cycle_list().clone()
    }

    #[must_use]
    pub fn in_cycle(&self, project: &ProjectVersionRef) -> bool {
        self.cycle_list().iter().any(|c| c.contains_project(project))
    }

    #[must_use]
    pub fn relationship_in_cycle(&self, rel: &Relationship) -> bool {
        self.cycle_list()
            .iter()
            .any(|c| c.contains_relationship(rel))
    }

    // -- queries -----------------------------------------------------------

    /// Every edge under the view, placeholder self-parent sentinels
    /// suppressed.
    pub fn all_relationships(&self) -> Result<Vec<Relationship>, GraphError> {
        Ok(self
            .exact_all_relationships()?
            .into_iter()
            .filter(|r| !r.is_placeholder_parent())
            .collect())
    }

    /// Every edge under the view, sentinels included.
    pub fn exact_all_relationships(&self) -> Result<Vec<Relationship>, GraphError> {
        Ok(self.store.all_relationships(&self.view)?.unwrap_or_default())
    }

    /// Outbound edges of a vertex in declaration order, sentinels
    /// suppressed. `Ok(None)` when the vertex is unknown.
    pub fn relationships_declared_by(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, GraphError> {
        let Some(mut rels) = self
            .store
            .relationships_declared_by(&self.view, project)?
        else {
            return Ok(None);
        };
        rels.retain(|r| !r.is_placeholder_parent());
        rels.sort_by_key(|r| (bucket(r.kind()), r.index()));
        Ok(Some(rels))
    }

    /// Edges targeting a vertex. `Ok(None)` when the vertex is unknown.
    pub fn relationships_targeting(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, GraphError> {
        Ok(self
            .store
            .relationships_targeting(&self.view, project)?
            .map(|rels| {
                rels.into_iter()
                    .filter(|r| !r.is_placeholder_parent())
                    .collect()
            }))
    }

    #[must_use]
    pub fn contains_project(&self, project: &ProjectVersionRef) -> bool {
        let derived = self.derived();
        derived.connected.contains(project) || derived.incomplete.contains(project)
    }

    /// `true` when no referenced vertex is awaiting its outbound edges.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.derived().incomplete.is_empty()
    }

    /// `true` when no vertex is referenced with a non-concrete version.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.derived().variable.is_empty()
    }

    #[must_use]
    pub fn connected_projects(&self) -> BTreeSet<ProjectVersionRef> {
        self.derived().connected.clone()
    }

    #[must_use]
    pub fn incomplete_subgraphs(&self) -> BTreeSet<ProjectVersionRef> {
        self.derived().incomplete.clone()
    }

    #[must_use]
    pub fn variable_subgraphs(&self) -> BTreeSet<ProjectVersionRef> {
        self.derived().variable.clone()
    }
}

impl std::fmt::Debug for EffectiveGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectiveGraph")
            .field("key", &self.key)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

/// Declaration-order bucket for sorting a vertex's outbound edges:
/// parent first, then dependencies, managed dependencies, plugins,
/// managed plugins, extensions, plugin-level dependencies.
const fn bucket(kind: RelationshipKind) -> u8 {
    match kind {
        RelationshipKind::Parent => 0,
        RelationshipKind::Dependency => 1,
        RelationshipKind::ManagedDependency => 2,
        RelationshipKind::Plugin => 3,
        RelationshipKind::ManagedPlugin => 4,
        RelationshipKind::Extension => 5,
        RelationshipKind::PluginDependency => 6,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::{EffectiveGraph, ProjectKey};
    use crate::ident::{ArtifactRef, ProjectRef, ProjectVersionRef, SingleVersion, VersionSpec};
    use crate::rel::{Cycle, DependencyScope, Relationship};
    use crate::store::{GraphStore, MemoryStore};
    use crate::workspace::GraphView;

    fn pvr(artifact: &str) -> ProjectVersionRef {
        ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
    }

    fn dep(from: &str, to: &str) -> Relationship {
        dep_to(from, pvr(to))
    }

    fn dep_to(from: &str, to: ProjectVersionRef) -> Relationship {
        Relationship::dependency(
            pvr(from),
            ArtifactRef::jar(to),
            DependencyScope::Compile,
            0,
            false,
            BTreeSet::new(),
        )
    }

    fn graph(root: &str) -> EffectiveGraph {
        EffectiveGraph::open(
            Arc::new(MemoryStore::new()),
            GraphView::global(),
            ProjectKey::plain(pvr(root)),
        )
        .expect("open")
    }

    #[test]
    fn new_target_is_incomplete_until_it_declares() {
        let g = graph("root");
        g.add_relationship(&dep("root", "a")).expect("add");

        assert!(!g.is_complete());
        assert!(g.incomplete_subgraphs().contains(&pvr("a")));
        assert!(g.contains_project(&pvr("a")));

        g.add_relationship(&dep("a", "b")).expect("add");
        assert!(!g.incomplete_subgraphs().contains(&pvr("a")));
        assert!(g.connected_projects().contains(&pvr("a")));
        // b took a's place.
        assert!(g.incomplete_subgraphs().contains(&pvr("b")));
    }

    #[test]
    fn root_referenced_before_declaring_opens_connected_not_incomplete() {
        let store = Arc::new(MemoryStore::new());
        // The store only knows "root" as a target so far.
        store.add_relationships(&[dep("x", "root")]).expect("add");

        let g = EffectiveGraph::open(
            Arc::clone(&store) as _,
            GraphView::global(),
            ProjectKey::plain(pvr("root")),
        )
        .expect("open");

        assert!(g.connected_projects().contains(&pvr("root")));
        assert!(!g.incomplete_subgraphs().contains(&pvr("root")));
        let overlap: Vec<_> = g
            .connected_projects()
            .intersection(&g.incomplete_subgraphs())
            .cloned()
            .collect();
        assert!(overlap.is_empty(), "overlapping classifications: {overlap:?}");
    }

    #[test]
    fn variable_target_is_variable_not_incomplete() {
        let g = graph("root");
        let floating =
            ProjectRef::new("g", "a").with_version(VersionSpec::Variable("[1,)".to_string()));
        g.add_relationship(&dep_to("root", floating.clone()))
            .expect("add");

        assert!(!g.is_concrete());
        assert!(g.variable_subgraphs().contains(&floating));
        assert!(!g.incomplete_subgraphs().contains(&floating));
    }

    #[test]
    fn duplicate_edge_is_not_new() {
        let g = graph("root");
        let edge = dep("root", "a");
        assert!(g.add_relationship(&edge).expect("add"));
        assert!(!g.add_relationship(&edge).expect("add"));
    }

    #[test]
    fn batch_reconciles_against_shared_store() {
        let store = Arc::new(MemoryStore::new());
        let g = EffectiveGraph::open(
            Arc::clone(&store) as _,
            GraphView::global(),
            ProjectKey::plain(pvr("root")),
        )
        .expect("open");

        // Edge order in the batch does not matter: "a" declares later in
        // the slice than it is referenced.
        g.add_all(&[dep("root", "a"), dep("a", "b")]).expect("add");
        assert!(!g.incomplete_subgraphs().contains(&pvr("a")));
        assert!(g.incomplete_subgraphs().contains(&pvr("b")));
    }

    #[test]
    fn placeholder_parent_is_suppressed_on_filtered_reads() {
        let g = graph("root");
        let sentinel = Relationship::placeholder_parent(&pvr("root"));
        g.add_relationship(&sentinel).expect("add");
        g.add_relationship(&dep("root", "a")).expect("add");

        let all = g.all_relationships().expect("read");
        assert!(all.iter().all(|r| !r.is_placeholder_parent()));

        let declared = g
            .relationships_declared_by(&pvr("root"))
            .expect("read")
            .expect("known");
        assert_eq!(declared.len(), 1);

        // The exact path still exposes it.
        let exact = g.exact_all_relationships().expect("read");
        assert!(exact.iter().any(Relationship::is_placeholder_parent));
    }

    #[test]
    fn recorded_cycle_members_are_connected() {
        let g = graph("a");
        let cycle =
            Cycle::new(vec![dep("a", "b"), dep("b", "a")]).expect("cycle");
        g.record_cycle(cycle.clone()).expect("record");

        assert!(g.is_complete());
        assert!(g.in_cycle(&pvr("a")));
        assert!(g.in_cycle(&pvr("b")));
        assert!(!g.in_cycle(&pvr("c")));
        assert!(g.relationship_in_cycle(&dep("a", "b")));
        assert!(!g.relationship_in_cycle(&dep("b", "c")));

        // Recording the same cycle again does not duplicate it.
        g.record_cycle(cycle).expect("record");
        assert_eq!(g.cycles().len(), 1);
    }

    #[test]
    fn connect_splices_other_graph() {
        let g = graph("root");
        g.add_relationship(&dep("root", "lib")).expect("add");
        assert!(!g.is_complete());

        let other = graph("lib");
        other.add_relationship(&dep("lib", "leaf")).expect("add");
        other
            .store()
            .add_disconnected_project(&pvr("leaf"))
            .expect("register");

        g.connect(&other).expect("connect");
        assert!(g.connected_projects().contains(&pvr("lib")));
        assert!(!g.incomplete_subgraphs().contains(&pvr("lib")));
        let all = g.all_relationships().expect("read");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn declared_by_sorts_parent_first_then_declaration_order() {
        let g = graph("root");
        let parent = Relationship::parent(pvr("root"), pvr("pom"));
        let d0 = dep("root", "a");
        let plugin = Relationship::plugin(pvr("root"), pvr("p"), 0, false);
        // Insert out of order.
        g.add_all(&[plugin.clone(), d0.clone(), parent.clone()])
            .expect("add");

        let declared = g
            .relationships_declared_by(&pvr("root"))
            .expect("read")
            .expect("known");
        assert_eq!(declared, vec![parent, d0, plugin]);
    }

    #[test]
    fn unknown_vertex_reads_none() {
        let g = graph("root");
        g.add_relationship(&dep("root", "a")).expect("add");
        assert!(
            g.relationships_declared_by(&pvr("ghost"))
                .expect("read")
                .is_none()
        );
        assert!(
            g.relationships_targeting(&pvr("ghost"))
                .expect("read")
                .is_none()
        );
    }
}
