//! Leaves-first build ordering.
//!
//! A [`BuildOrderTraversal`] walks the graph and maintains an ordered list
//! of unversioned coordinates such that every project appears before
//! anything that depends on it. Recorded cycles that survive the
//! traversal's filter are reported alongside the order; sequencing their
//! members is the caller's problem.

use serde::{Deserialize, Serialize};

use crate::filter::RelationshipFilter;
use crate::graph::{EffectiveGraph, GraphError};
use crate::ident::ProjectRef;
use crate::rel::{Cycle, Relationship};

use super::{Traversal, walk};

/// The result: build-ready ordering plus the cycles the order cannot
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOrder {
    order: Vec<ProjectRef>,
    cycles: Vec<Cycle>,
}

impl BuildOrder {
    /// Unversioned coordinates, leaves first.
    #[must_use]
    pub fn order(&self) -> &[ProjectRef] {
        &self.order
    }

    /// Cycles whose edges all survive the traversal filter.
    #[must_use]
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }
}

/// Traversal computing a [`BuildOrder`].
#[derive(Debug, Clone)]
pub struct BuildOrderTraversal {
    filter: RelationshipFilter,
    order: Vec<ProjectRef>,
}

impl Default for BuildOrderTraversal {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildOrderTraversal {
    /// Order over every relationship kind.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: RelationshipFilter::Any,
            order: Vec::new(),
        }
    }

    /// Order over the edges `filter` accepts. Parent edges are always
    /// followed as well: a child is never ordered before the project it
    /// inherits from.
    #[must_use]
    pub fn with_filter(filter: RelationshipFilter) -> Self {
        Self {
            filter: RelationshipFilter::or([filter, RelationshipFilter::parent_chain()]),
            order: Vec::new(),
        }
    }

    /// Walk `graph` and produce the order.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the underlying walk.
    pub fn run(mut self, graph: &EffectiveGraph) -> Result<BuildOrder, GraphError> {
        walk(graph, &mut self)?;

        // A recorded cycle belongs to this order only if its edges all
        // pass the filter, re-deriving the per-hop state around the loop.
        let cycles = graph
            .cycles()
            .into_iter()
            .filter(|cycle| {
                let mut state = self.filter.clone();
                cycle.relationships().iter().all(|rel| {
                    let ok = state.accept(rel);
                    state = state.child_filter(rel);
                    ok
                })
            })
            .collect();

        Ok(BuildOrder {
            order: self.order,
            cycles,
        })
    }

    /// Insert `target` immediately before `declaring`, appending
    /// `declaring` first when unseen. Projects already placed stay put.
    fn record(&mut self, declaring: ProjectRef, target: ProjectRef) {
        if declaring == target {
            return;
        }
        let declaring_at = match self.order.iter().position(|p| *p == declaring) {
            Some(at) => at,
            None => {
                self.order.push(declaring);
                self.order.len() - 1
            }
        };
        if !self.order.contains(&target) {
            self.order.insert(declaring_at, target);
        }
    }
}

impl Traversal for BuildOrderTraversal {
    fn root_filter(&self) -> RelationshipFilter {
        self.filter.clone()
    }

    fn visit(&mut self, rel: &Relationship, _path: &[Relationship], _pass: usize) -> bool {
        self.record(rel.declaring().unversioned(), rel.target_project().unversioned());
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::BuildOrderTraversal;
    use crate::filter::RelationshipFilter;
    use crate::graph::{EffectiveGraph, ProjectKey};
    use crate::ident::{ArtifactRef, ProjectRef, ProjectVersionRef, SingleVersion};
    use crate::rel::{DependencyScope, Relationship, RelationshipKind};
    use crate::store::MemoryStore;
    use crate::workspace::GraphView;

    fn pvr(artifact: &str) -> ProjectVersionRef {
        ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
    }

    fn dep(from: &str, to: &str) -> Relationship {
        scoped(from, to, DependencyScope::Compile, 0)
    }

    fn scoped(from: &str, to: &str, scope: DependencyScope, index: u32) -> Relationship {
        Relationship::dependency(
            pvr(from),
            ArtifactRef::jar(pvr(to)),
            scope,
            index,
            false,
            BTreeSet::new(),
        )
    }

    fn graph_with(root: &str, rels: &[Relationship]) -> EffectiveGraph {
        let graph = EffectiveGraph::open(
            Arc::new(MemoryStore::new()),
            GraphView::global(),
            ProjectKey::plain(pvr(root)),
        )
        .expect("open");
        graph.add_all(rels).expect("add");
        graph
    }

    fn names(order: &[ProjectRef]) -> Vec<&str> {
        order.iter().map(ProjectRef::artifact_id).collect()
    }

    #[test]
    fn chain_orders_leaves_first() {
        let graph = graph_with("p", &[dep("p", "q"), dep("q", "r")]);
        let order = BuildOrderTraversal::new().run(&graph).expect("order");
        assert_eq!(names(order.order()), vec!["r", "q", "p"]);
        assert!(order.cycles().is_empty());
    }

    #[test]
    fn diamond_places_shared_leaf_before_both_consumers() {
        let graph = graph_with(
            "top",
            &[
                scoped("top", "left", DependencyScope::Compile, 0),
                scoped("top", "right", DependencyScope::Compile, 1),
                dep("left", "base"),
                dep("right", "base"),
            ],
        );
        let order = BuildOrderTraversal::new().run(&graph).expect("order");

        let order = names(order.order());
        let at = |name| order.iter().position(|n| *n == name).expect("placed");
        assert!(at("base") < at("left"));
        assert!(at("base") < at("right"));
        assert!(at("left") < at("top"));
        assert!(at("right") < at("top"));
    }

    #[test]
    fn parent_chain_is_always_ordered() {
        let graph = graph_with(
            "child",
            &[Relationship::parent(pvr("child"), pvr("pom")), dep("child", "lib")],
        );
        // A filter that only wants plugin edges still orders the parent.
        let order = BuildOrderTraversal::with_filter(RelationshipFilter::kinds([
            RelationshipKind::Plugin,
        ]))
        .run(&graph)
        .expect("order");

        assert_eq!(names(order.order()), vec!["pom", "child"]);
    }

    #[test]
    fn cycle_members_are_ordered_and_cycle_reported() {
        let graph = graph_with("a", &[dep("a", "b"), dep("b", "a")]);
        let order = BuildOrderTraversal::new().run(&graph).expect("order");

        assert_eq!(names(order.order()), vec!["b", "a"]);
        assert_eq!(order.cycles().len(), 1);
    }

    #[test]
    fn filtered_out_cycle_is_not_reported() {
        // The b->a closing edge is test-scoped; one hop past a->b the
        // scope filter no longer admits test edges, so the cycle does not
        // survive re-derivation.
        let graph = graph_with(
            "a",
            &[dep("a", "b"), scoped("b", "a", DependencyScope::Test, 0)],
        );
        // Record the cycle under an unrestricted walk first.
        let unfiltered = BuildOrderTraversal::new().run(&graph).expect("order");
        assert_eq!(unfiltered.cycles().len(), 1);

        let order = BuildOrderTraversal::with_filter(RelationshipFilter::scopes([
            DependencyScope::Compile,
        ]))
        .run(&graph)
        .expect("order");

        assert!(order.cycles().is_empty());
    }

    #[test]
    fn versions_collapse_to_one_coordinate() {
        let v2 = ProjectRef::new("g", "lib").with_version(SingleVersion::new("2").expect("v"));
        let graph = graph_with(
            "root",
            &[
                scoped("root", "lib", DependencyScope::Compile, 0),
                Relationship::dependency(
                    pvr("mid"),
                    ArtifactRef::jar(v2),
                    DependencyScope::Compile,
                    0,
                    false,
                    BTreeSet::new(),
                ),
                scoped("root", "mid", DependencyScope::Compile, 1),
            ],
        );
        let order = BuildOrderTraversal::new().run(&graph).expect("order");

        let lib_count = names(order.order())
            .iter()
            .filter(|n| **n == "lib")
            .count();
        assert_eq!(lib_count, 1);
    }
}
