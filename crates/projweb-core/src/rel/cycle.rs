//! Cycles as first-class values.
//!
//! A cycle is an ordered, closed walk of relationships: each edge's target
//! vertex is the next edge's declaring vertex, and the last edge's target
//! is the first edge's declaring vertex. Cycles are detected during
//! traversal and recorded on the container — the edge set itself carries
//! no cycle back-pointers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ident::ProjectVersionRef;

use super::relationship::Relationship;

/// A candidate edge sequence that does not form a closed walk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    #[error("a cycle requires at least one relationship")]
    Empty,

    /// The walk breaks between edge `at` and edge `at + 1` (or fails to
    /// close back to the start, when `at` is the last edge).
    #[error("relationship sequence is not a closed walk (break after edge {at})")]
    NotClosed { at: usize },
}

/// An ordered closed walk of relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    relationships: Vec<Relationship>,
}

impl Cycle {
    /// Validate and wrap an edge sequence.
    ///
    /// # Errors
    ///
    /// [`CycleError::Empty`] for an empty sequence, [`CycleError::NotClosed`]
    /// when consecutive edges do not chain or the walk fails to return to
    /// its start vertex.
    pub fn new(relationships: Vec<Relationship>) -> Result<Self, CycleError> {
        if relationships.is_empty() {
            return Err(CycleError::Empty);
        }
        for (i, rel) in relationships.iter().enumerate() {
            let next = &relationships[(i + 1) % relationships.len()];
            if rel.target_project() != next.declaring() {
                return Err(CycleError::NotClosed { at: i });
            }
        }
        Ok(Self { relationships })
    }

    /// The edges of the cycle, in walk order.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Number of edges (equal to the number of distinct vertices).
    #[must_use]
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Always `false` for a constructed cycle: [`Cycle::new`] rejects
    /// empty sequences. Kept alongside [`Cycle::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// The vertices of the cycle, in walk order.
    pub fn projects(&self) -> impl Iterator<Item = &ProjectVersionRef> {
        self.relationships.iter().map(Relationship::declaring)
    }

    /// `true` if the vertex participates in this cycle.
    #[must_use]
    pub fn contains_project(&self, project: &ProjectVersionRef) -> bool {
        self.projects().any(|p| p == project)
    }

    /// `true` if the exact edge participates in this cycle.
    #[must_use]
    pub fn contains_relationship(&self, rel: &Relationship) -> bool {
        self.relationships.iter().any(|r| r == rel)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rel in &self.relationships {
            write!(f, "{} -> ", rel.declaring())?;
        }
        match self.relationships.first() {
            Some(first) => write!(f, "{}", first.declaring()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cycle, CycleError};
    use crate::ident::{ProjectRef, ProjectVersionRef, SingleVersion};
    use crate::rel::relationship::Relationship;

    fn pvr(artifact: &str) -> ProjectVersionRef {
        ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
    }

    fn parent_edge(from: &str, to: &str) -> Relationship {
        Relationship::parent(pvr(from), pvr(to))
    }

    #[test]
    fn two_edge_cycle_is_closed() {
        let cycle =
            Cycle::new(vec![parent_edge("a", "b"), parent_edge("b", "a")]).expect("closed walk");
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains_project(&pvr("a")));
        assert!(cycle.contains_project(&pvr("b")));
        assert!(!cycle.contains_project(&pvr("c")));
        assert!(cycle.contains_relationship(&parent_edge("a", "b")));
        assert!(!cycle.contains_relationship(&parent_edge("b", "c")));
    }

    #[test]
    fn empty_sequence_rejected() {
        assert_eq!(Cycle::new(vec![]), Err(CycleError::Empty));
    }

    #[test]
    fn broken_chain_rejected() {
        let result = Cycle::new(vec![parent_edge("a", "b"), parent_edge("c", "a")]);
        assert_eq!(result, Err(CycleError::NotClosed { at: 0 }));
    }

    #[test]
    fn unclosed_walk_rejected() {
        let result = Cycle::new(vec![parent_edge("a", "b"), parent_edge("b", "c")]);
        assert_eq!(result, Err(CycleError::NotClosed { at: 1 }));
    }

    #[test]
    fn self_loop_is_a_one_edge_cycle() {
        let cycle = Cycle::new(vec![parent_edge("a", "a")]).expect("self loop");
        assert_eq!(cycle.len(), 1);
        assert!(cycle.contains_project(&pvr("a")));
    }

    #[test]
    fn display_closes_the_walk() {
        let cycle =
            Cycle::new(vec![parent_edge("a", "b"), parent_edge("b", "a")]).expect("closed walk");
        assert_eq!(cycle.to_string(), "g:a:1 -> g:b:1 -> g:a:1");
    }
}
