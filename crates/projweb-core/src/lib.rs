//! projweb-core: incremental effective-dependency-graph engine.
//!
//! Versioned project coordinates are vertices; typed declared
//! relationships (parent, dependency, plugin, ...) are edges. The graph
//! layer tracks which subgraphs are still incomplete or variable as edges
//! arrive, records dependency cycles as first-class values, and walks the
//! result with composable, depth-stateful filters — build ordering
//! included. Durability is pluggable through the [`store::GraphStore`]
//! trait.

pub mod filter;
pub mod graph;
pub mod ident;
pub mod manager;
pub mod rel;
pub mod store;
pub mod traverse;
pub mod workspace;

pub use filter::RelationshipFilter;
pub use graph::{EffectiveGraph, GraphBuilder, GraphError, GraphFacts, ProjectKey};
pub use ident::{ArtifactRef, ProjectRef, ProjectVersionRef, SingleVersion, VersionSpec};
pub use manager::GraphManager;
pub use rel::{
    Cycle, DependencyScope, DirectRelationships, Relationship, RelationshipKind,
};
pub use store::{GraphStore, MemoryStore, StoreError};
pub use traverse::{BuildOrder, BuildOrderTraversal, Traversal, walk};
pub use workspace::{GraphView, Workspace, WorkspaceConfig};
