//! Staged construction of an effective graph.
//!
//! Collects the root project's direct relationships, any number of
//! already-discovered subgraph bundles and loose edges, and pre-known
//! cycles, then materializes everything into one [`EffectiveGraph`] in a
//! single batch.

use std::sync::Arc;

use crate::graph::{EffectiveGraph, GraphError, ProjectKey};
use crate::rel::{Cycle, DirectRelationships, Relationship, RelationshipKind};
use crate::store::GraphStore;
use crate::workspace::GraphView;

/// Builder for an [`EffectiveGraph`].
pub struct GraphBuilder {
    key: ProjectKey,
    view: GraphView,
    store: Arc<dyn GraphStore>,
    relationships: Vec<Relationship>,
    cycles: Vec<Cycle>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("key", &self.key)
            .field("relationships", &self.relationships.len())
            .field("cycles", &self.cycles.len())
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>, view: GraphView, key: ProjectKey) -> Self {
        Self {
            key,
            view,
            store,
            relationships: Vec::new(),
            cycles: Vec::new(),
        }
    }

    /// Start from a root project's declared-relationship bundle; the
    /// graph's key is the bundle's.
    #[must_use]
    pub fn from_bundle(
        store: Arc<dyn GraphStore>,
        view: GraphView,
        bundle: &DirectRelationships,
    ) -> Self {
        let mut builder = Self::new(store, view, bundle.key().clone());
        builder.relationships.extend(bundle.exact_all());
        builder
    }

    /// Add the full contents of another project's bundle.
    #[must_use]
    pub fn with_bundle(mut self, bundle: &DirectRelationships) -> Self {
        self.relationships.extend(bundle.exact_all());
        self
    }

    /// Add loose edges discovered out of band.
    #[must_use]
    pub fn with_relationships(
        mut self,
        rels: impl IntoIterator<Item = Relationship>,
    ) -> Self {
        self.relationships.extend(rels);
        self
    }

    /// Pre-record a known cycle.
    #[must_use]
    pub fn with_cycle(mut self, cycle: Cycle) -> Self {
        self.cycles.push(cycle);
        self
    }

    /// Materialize the graph: guarantee the root declares a parent edge
    /// (synthesizing the placeholder sentinel when none was given), store
    /// every collected edge in one batch, and record the cycles.
    ///
    /// Edges land in the store before the graph opens, so the derived
    /// sets seed from the full stored picture — including anything other
    /// graphs over the same store contributed.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn build(mut self) -> Result<EffectiveGraph, GraphError> {
        let root = self.key.project().clone();
        let has_parent = self
            .relationships
            .iter()
            .any(|r| r.kind() == RelationshipKind::Parent && r.declaring() == &root);
        if !has_parent {
            self.relationships.push(Relationship::placeholder_parent(&root));
        }

        self.store.add_relationships(&self.relationships)?;
        let graph = EffectiveGraph::open(self.store, self.view, self.key)?;
        for cycle in self.cycles {
            graph.record_cycle(cycle)?;
        }
        Ok(graph)
    }
}
