//! The backing graph-store contract.
//!
//! # Overview
//!
//! The effective graph owns no wire protocol or on-disk format — durability
//! is delegated to a [`GraphStore`]. Store calls are synchronous and are
//! the durability commit point: an edge is durable only once the call
//! returns. A failed call propagates to the caller of the operation that
//! triggered it; in-memory derived state may then be ahead of the store,
//! and reconciling or discarding is the caller's responsibility.
//!
//! # Unknown vs. empty
//!
//! Relationship queries return `Option<Vec<..>>`: `None` means the vertex
//! is unknown to the store, `Some(vec![])` means it is known and has no
//! matching edges. The distinction is what separates an incomplete
//! subgraph (referenced, outbound edges unknown) from a genuine leaf.

// Every method fails the same way: a StoreError from the backend.
#![allow(clippy::missing_errors_doc)]

pub mod memory;

pub use memory::MemoryStore;

use std::collections::{BTreeMap, BTreeSet};

use crate::ident::{ProjectRef, ProjectVersionRef, SingleVersion};
use crate::rel::Relationship;
use crate::workspace::{GraphView, Workspace, WorkspaceConfig};

/// Backing-store failure: unreachable or inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("graph store i/o failure: {0}")]
    Io(String),

    #[error("graph store inconsistency: {0}")]
    Inconsistent(String),

    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),
}

/// The durable relationship store contract (external collaborator).
///
/// Implementations deduplicate inserts by edge identity, distinguish
/// unknown from empty on reads, and scope selection persistence by
/// workspace id. Views gate reads: a view's filter is applied at root
/// level to each edge, and its root set (when non-empty) restricts vertex
/// enumeration to vertices reachable in the stored edge set — full
/// path-dependent filtering belongs to the traversal engine, not the
/// store.
pub trait GraphStore: Send + Sync {
    /// Insert edges, deduplicated by identity. Returns the edges that
    /// were actually new.
    fn add_relationships(
        &self,
        rels: &[Relationship],
    ) -> Result<Vec<Relationship>, StoreError>;

    /// Record a vertex with no outbound edges, so it reads as a known
    /// leaf (`Some(empty)`) rather than an incomplete subgraph.
    fn add_disconnected_project(&self, project: &ProjectVersionRef) -> Result<(), StoreError>;

    /// Outbound edges of a vertex. `None` when the vertex is unknown.
    fn relationships_declared_by(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, StoreError>;

    /// Edges targeting a vertex. `None` when the vertex is unknown.
    fn relationships_targeting(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, StoreError>;

    /// Every edge visible to the view. `None` when the store holds no
    /// graph at all for the view.
    fn all_relationships(&self, view: &GraphView)
    -> Result<Option<Vec<Relationship>>, StoreError>;

    /// `true` if the vertex is known in any role (declaring, target, or
    /// registered disconnected).
    fn contains_project(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<bool, StoreError>;

    /// `true` if the vertex is referenced but its outbound edges are
    /// unknown.
    fn is_missing(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<bool, StoreError>;

    /// Every known vertex under the view.
    fn all_projects(&self, view: &GraphView)
    -> Result<BTreeSet<ProjectVersionRef>, StoreError>;

    /// Vertices referenced as targets whose outbound edges are unknown.
    fn missing_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError>;

    /// Vertices referenced with a non-concrete version spec.
    fn variable_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError>;

    /// Every known versioned vertex sharing the given group+artifact.
    fn projects_matching(
        &self,
        view: &GraphView,
        project: &ProjectRef,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError>;

    // -- metadata ----------------------------------------------------------

    fn metadata(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<BTreeMap<String, String>, StoreError>;

    fn add_metadata(
        &self,
        project: &ProjectVersionRef,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    fn set_metadata(
        &self,
        project: &ProjectVersionRef,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), StoreError>;

    fn projects_with_metadata(
        &self,
        view: &GraphView,
        key: &str,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError>;

    // -- workspaces --------------------------------------------------------

    /// Create and persist a new workspace; the store assigns its id.
    fn create_workspace(&self, config: WorkspaceConfig) -> Result<Workspace, StoreError>;

    fn load_workspace(&self, id: &str) -> Result<Option<Workspace>, StoreError>;

    fn store_workspace(&self, workspace: &Workspace) -> Result<(), StoreError>;

    /// Delete a workspace and its selections. Returns `false` when the id
    /// was unknown.
    fn delete_workspace(&self, id: &str) -> Result<bool, StoreError>;

    fn all_workspaces(&self) -> Result<Vec<Workspace>, StoreError>;

    // -- version selections ------------------------------------------------

    /// Pin an exact coordinate, scoped to a workspace.
    fn select_version(
        &self,
        workspace_id: &str,
        project: &ProjectVersionRef,
        version: &SingleVersion,
    ) -> Result<(), StoreError>;

    /// Pin every coordinate sharing a group+artifact, scoped to a
    /// workspace.
    fn select_version_for_all(
        &self,
        workspace_id: &str,
        project: &ProjectRef,
        version: &SingleVersion,
    ) -> Result<(), StoreError>;

    /// Drop every pin recorded for a workspace.
    fn clear_selected_versions(&self, workspace_id: &str) -> Result<(), StoreError>;
}
