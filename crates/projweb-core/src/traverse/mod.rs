//! Cycle-aware depth-first traversal.
//!
//! # Overview
//!
//! [`walk`] drives a [`Traversal`] over an [`EffectiveGraph`] from its
//! root: outbound edges in declaration order, placeholder sentinels
//! skipped, the active filter consulted per edge and re-derived per hop.
//!
//! Cycles are detected against the live path. When a followed edge closes
//! back onto a vertex already on the path, the closing edge sequence is
//! recorded on the graph as a [`Cycle`] and the edge is not followed, so
//! the walk terminates on cyclic graphs without losing the information
//! that the cycle exists.
//!
//! Revisit suppression is keyed on (vertex, filter-state identity): the
//! same vertex is expanded again only when reached under a filter state it
//! has not been expanded under, since a different state can admit
//! different children.

pub mod build_order;

pub use build_order::{BuildOrder, BuildOrderTraversal};

use std::collections::BTreeSet;

use tracing::trace;

use crate::filter::RelationshipFilter;
use crate::graph::{EffectiveGraph, GraphError};
use crate::ident::ProjectVersionRef;
use crate::rel::{Cycle, Relationship};

/// A visitor driven by [`walk`].
pub trait Traversal {
    /// Number of passes over the graph. Multi-pass traversals see the
    /// same edges again with accumulated state.
    fn passes(&self) -> usize {
        1
    }

    /// The filter state at the root, re-derived per hop via
    /// [`RelationshipFilter::child_filter`].
    fn root_filter(&self) -> RelationshipFilter {
        RelationshipFilter::Any
    }

    fn start_pass(&mut self, _pass: usize) {}

    fn end_pass(&mut self, _pass: usize) {}

    /// Called for each accepted edge. `path` is the accepted edge chain
    /// from the root to the edge's declaring vertex. Return `false` to
    /// prune the subtree below this edge.
    fn visit(&mut self, rel: &Relationship, path: &[Relationship], pass: usize) -> bool;
}

/// Run `traversal` over `graph`.
///
/// # Errors
///
/// Propagates store failures from edge reads and cycle recording.
pub fn walk<T: Traversal>(graph: &EffectiveGraph, traversal: &mut T) -> Result<(), GraphError> {
    let root = graph.root().clone();
    for pass in 0..traversal.passes() {
        traversal.start_pass(pass);
        let filter = traversal.root_filter();
        let mut path = Vec::new();
        let mut seen = BTreeSet::new();
        expand(graph, traversal, &root, &filter, &mut path, &mut seen, pass)?;
        traversal.end_pass(pass);
    }
    Ok(())
}

/// One in-flight expansion: the declaring vertex's outbound edges, a
/// cursor into them, and the filter state the vertex was reached under.
struct Frame {
    edges: Vec<Relationship>,
    next: usize,
    filter: RelationshipFilter,
}

// Explicit frame stack; walk depth is bounded by the heap, not the
// call stack.
fn expand<T: Traversal>(
    graph: &EffectiveGraph,
    traversal: &mut T,
    vertex: &ProjectVersionRef,
    filter: &RelationshipFilter,
    path: &mut Vec<Relationship>,
    seen: &mut BTreeSet<(ProjectVersionRef, String)>,
    pass: usize,
) -> Result<(), GraphError> {
    // Unknown vertex: an incomplete subgraph boundary, nothing to expand.
    let Some(edges) = graph.relationships_declared_by(vertex)? else {
        return Ok(());
    };
    let mut frames = vec![Frame {
        edges,
        next: 0,
        filter: filter.clone(),
    }];

    loop {
        let Some(frame) = frames.last_mut() else { break };
        if frame.next >= frame.edges.len() {
            frames.pop();
            if !frames.is_empty() {
                path.pop();
            }
            continue;
        }
        let edge = frame.edges[frame.next].clone();
        frame.next += 1;
        let filter = frame.filter.clone();

        if !filter.accept(&edge) {
            continue;
        }
        let target = edge.target_project();

        if target == edge.declaring() {
            // Self-referential edge: a one-edge cycle.
            if let Ok(cycle) = Cycle::new(vec![edge.clone()]) {
                graph.record_cycle(cycle)?;
            }
            continue;
        }
        if let Some(start) = path.iter().position(|r| r.declaring() == target) {
            let mut closing: Vec<Relationship> = path[start..].to_vec();
            closing.push(edge.clone());
            trace!(%edge, "edge closes a cycle");
            if let Ok(cycle) = Cycle::new(closing) {
                graph.record_cycle(cycle)?;
            }
            continue;
        }

        if !traversal.visit(&edge, path, pass) {
            continue;
        }

        let child = filter.child_filter(&edge);
        let target = target.clone();
        if seen.insert((target.clone(), child.condensed_id()))
            && let Some(edges) = graph.relationships_declared_by(&target)?
        {
            path.push(edge);
            frames.push(Frame {
                edges,
                next: 0,
                filter: child,
            });
        }
    }
    Ok(())
}
