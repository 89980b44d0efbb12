//! Composable relationship filters.
//!
//! # Overview
//!
//! A filter gates which edges a traversal follows. Filters compose as an
//! explicit tree of tagged nodes — one recursive [`accept`] evaluator and
//! one recursive [`child_filter`] derivation, instead of a subclass per
//! predicate.
//!
//! # Depth-statefulness
//!
//! [`child_filter`] returns the filter state to use one hop further along
//! a specific edge. It is a pure function of (current state, edge): deriving
//! the child chain along the same edge sequence always yields the same
//! state, which is what lets recorded cycles be re-checked against a
//! traversal's filter after the fact. The [`Scopes`] variant is the
//! stateful one — after a dependency hop its direct scope set narrows to
//! the transitive set, mirroring how `test`/`provided` dependencies bind
//! only the declaring project.
//!
//! Contradictory compositions (an `And` of disjoint kind sets, say)
//! degrade to a filter that never accepts; they are never an error.
//!
//! [`accept`]: RelationshipFilter::accept
//! [`child_filter`]: RelationshipFilter::child_filter
//! [`Scopes`]: RelationshipFilter::Scopes

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rel::{DependencyScope, Relationship, RelationshipKind};

/// A predicate tree over relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipFilter {
    /// Accepts every edge; child filter is itself.
    Any,
    /// Short-circuit conjunction. Empty `And` accepts everything.
    And(Vec<RelationshipFilter>),
    /// Short-circuit disjunction. Empty `Or` accepts nothing.
    Or(Vec<RelationshipFilter>),
    /// Kind restriction; stateless.
    Kinds(BTreeSet<RelationshipKind>),
    /// Scope restriction for concrete dependency edges. Parent edges pass
    /// (so inheritance chains stay walkable); after one dependency hop the
    /// `direct` set is replaced by `transitive`.
    Scopes {
        direct: BTreeSet<DependencyScope>,
        transitive: BTreeSet<DependencyScope>,
    },
    /// Parent-chain control: accepts only parent edges, optionally
    /// including the placeholder self-parent sentinels.
    ParentChain { include_placeholder: bool },
}

impl RelationshipFilter {
    /// Conjunction of the given filters.
    #[must_use]
    pub fn and(filters: impl IntoIterator<Item = Self>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// Disjunction of the given filters.
    #[must_use]
    pub fn or(filters: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// Restriction to the given kinds.
    #[must_use]
    pub fn kinds(kinds: impl IntoIterator<Item = RelationshipKind>) -> Self {
        Self::Kinds(kinds.into_iter().collect())
    }

    /// Scope restriction with the conventional transitive narrowing:
    /// whatever the direct set, one hop out only `compile`/`runtime`
    /// dependencies are followed.
    #[must_use]
    pub fn scopes(direct: impl IntoIterator<Item = DependencyScope>) -> Self {
        Self::Scopes {
            direct: direct.into_iter().collect(),
            transitive: [DependencyScope::Compile, DependencyScope::Runtime]
                .into_iter()
                .collect(),
        }
    }

    /// Parent edges only, placeholder sentinels excluded.
    #[must_use]
    pub const fn parent_chain() -> Self {
        Self::ParentChain {
            include_placeholder: false,
        }
    }

    /// Evaluate the filter against one edge.
    #[must_use]
    pub fn accept(&self, rel: &Relationship) -> bool {
        match self {
            Self::Any => true,
            Self::And(filters) => filters.iter().all(|f| f.accept(rel)),
            Self::Or(filters) => filters.iter().any(|f| f.accept(rel)),
            Self::Kinds(kinds) => kinds.contains(&rel.kind()),
            Self::Scopes { direct, .. } => match rel.kind() {
                RelationshipKind::Parent => !rel.is_placeholder_parent(),
                RelationshipKind::Dependency => {
                    rel.scope().is_some_and(|scope| direct.contains(&scope))
                }
                _ => false,
            },
            Self::ParentChain {
                include_placeholder,
            } => {
                rel.kind() == RelationshipKind::Parent
                    && (*include_placeholder || !rel.is_placeholder_parent())
            }
        }
    }

    /// The filter state one hop further along `rel`.
    #[must_use]
    pub fn child_filter(&self, rel: &Relationship) -> Self {
        match self {
            Self::Any => Self::Any,
            Self::And(filters) => {
                Self::And(filters.iter().map(|f| f.child_filter(rel)).collect())
            }
            Self::Or(filters) => Self::Or(filters.iter().map(|f| f.child_filter(rel)).collect()),
            Self::Kinds(_) | Self::ParentChain { .. } => self.clone(),
            Self::Scopes { transitive, .. } => {
                if rel.kind() == RelationshipKind::Dependency {
                    Self::Scopes {
                        direct: transitive.clone(),
                        transitive: transitive.clone(),
                    }
                } else {
                    self.clone()
                }
            }
        }
    }

    /// Whether managed (declared-but-not-materialized) edges are of
    /// interest to this filter at all.
    #[must_use]
    pub fn include_managed(&self) -> bool {
        match self {
            Self::Any => true,
            Self::And(filters) => filters.iter().all(Self::include_managed),
            Self::Or(filters) => filters.iter().any(Self::include_managed),
            Self::Kinds(kinds) => kinds.iter().any(|k| k.is_managed()),
            Self::Scopes { .. } | Self::ParentChain { .. } => false,
        }
    }

    /// Whether concrete (non-managed) edges are of interest.
    #[must_use]
    pub fn include_concrete(&self) -> bool {
        match self {
            Self::Any | Self::Scopes { .. } | Self::ParentChain { .. } => true,
            Self::And(filters) => filters.iter().all(Self::include_concrete),
            Self::Or(filters) => filters.iter().any(Self::include_concrete),
            Self::Kinds(kinds) => kinds.iter().any(|k| !k.is_managed()),
        }
    }

    /// The kinds this filter can ever accept. An empty set means the
    /// filter never accepts (valid, merely unhelpful).
    #[must_use]
    pub fn allowed_kinds(&self) -> BTreeSet<RelationshipKind> {
        match self {
            Self::Any => RelationshipKind::ALL.into_iter().collect(),
            Self::And(filters) => {
                let mut kinds: BTreeSet<_> = RelationshipKind::ALL.into_iter().collect();
                for f in filters {
                    let allowed = f.allowed_kinds();
                    kinds.retain(|k| allowed.contains(k));
                }
                kinds
            }
            Self::Or(filters) => filters.iter().flat_map(Self::allowed_kinds).collect(),
            Self::Kinds(kinds) => kinds.clone(),
            Self::Scopes { .. } => [RelationshipKind::Parent, RelationshipKind::Dependency]
                .into_iter()
                .collect(),
            Self::ParentChain { .. } => [RelationshipKind::Parent].into_iter().collect(),
        }
    }

    /// Condensed identity string. Two filters whose condensed ids match
    /// are interchangeable for caching purposes.
    #[must_use]
    pub fn condensed_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RelationshipFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            items: impl IntoIterator<Item = T>,
        ) -> fmt::Result {
            for (i, item) in items.into_iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Self::Any => write!(f, "ANY"),
            Self::And(filters) => {
                write!(f, "AND(")?;
                join(f, filters)?;
                write!(f, ")")
            }
            Self::Or(filters) => {
                write!(f, "OR(")?;
                join(f, filters)?;
                write!(f, ")")
            }
            Self::Kinds(kinds) => {
                write!(f, "KINDS(")?;
                join(f, kinds)?;
                write!(f, ")")
            }
            Self::Scopes { direct, transitive } => {
                write!(f, "SCOPES(")?;
                join(f, direct)?;
                write!(f, ";transitive:")?;
                join(f, transitive)?;
                write!(f, ")")
            }
            Self::ParentChain {
                include_placeholder,
            } => {
                if *include_placeholder {
                    write!(f, "PARENT(+placeholder)")
                } else {
                    write!(f, "PARENT")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::RelationshipFilter;
    use crate::ident::{ArtifactRef, ProjectRef, ProjectVersionRef, SingleVersion};
    use crate::rel::{DependencyScope, Relationship, RelationshipKind};

    fn pvr(artifact: &str) -> ProjectVersionRef {
        ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
    }

    fn dep(from: &str, to: &str, scope: DependencyScope) -> Relationship {
        Relationship::dependency(
            pvr(from),
            ArtifactRef::jar(pvr(to)),
            scope,
            0,
            false,
            BTreeSet::new(),
        )
    }

    fn plugin(from: &str, to: &str) -> Relationship {
        Relationship::plugin(pvr(from), pvr(to), 0, false)
    }

    #[test]
    fn any_accepts_everything_and_is_its_own_child() {
        let f = RelationshipFilter::Any;
        let edge = dep("a", "b", DependencyScope::Test);
        assert!(f.accept(&edge));
        assert_eq!(f.child_filter(&edge), RelationshipFilter::Any);
        assert!(f.include_managed());
        assert!(f.include_concrete());
        assert_eq!(f.allowed_kinds().len(), 7);
    }

    #[test]
    fn or_matches_disjunction_of_branches() {
        let f1 = RelationshipFilter::kinds([RelationshipKind::Dependency]);
        let f2 = RelationshipFilter::kinds([RelationshipKind::Plugin]);
        let or = RelationshipFilter::or([f1.clone(), f2.clone()]);

        for edge in [
            dep("a", "b", DependencyScope::Compile),
            plugin("a", "p"),
            Relationship::parent(pvr("a"), pvr("b")),
        ] {
            assert_eq!(
                or.accept(&edge),
                f1.accept(&edge) || f2.accept(&edge),
                "edge: {edge}"
            );
        }
    }

    #[test]
    fn and_of_disjoint_kinds_never_accepts() {
        let contradiction = RelationshipFilter::and([
            RelationshipFilter::kinds([RelationshipKind::Dependency]),
            RelationshipFilter::kinds([RelationshipKind::Plugin]),
        ]);
        assert!(contradiction.allowed_kinds().is_empty());
        assert!(!contradiction.accept(&dep("a", "b", DependencyScope::Compile)));
        assert!(!contradiction.accept(&plugin("a", "p")));
    }

    #[test]
    fn scope_filter_narrows_after_dependency_hop() {
        let f = RelationshipFilter::scopes([DependencyScope::Compile, DependencyScope::Test]);
        let direct_test = dep("root", "a", DependencyScope::Test);
        assert!(f.accept(&direct_test));

        // One hop out, test scope no longer applies.
        let child = f.child_filter(&direct_test);
        let transitive_test = dep("a", "b", DependencyScope::Test);
        let transitive_compile = dep("a", "b", DependencyScope::Compile);
        assert!(!child.accept(&transitive_test));
        assert!(child.accept(&transitive_compile));

        // Deriving again is stable: the transitive set is a fixed point.
        let grandchild = child.child_filter(&transitive_compile);
        assert_eq!(child, grandchild);
    }

    #[test]
    fn scope_filter_follows_real_parents_only() {
        let f = RelationshipFilter::scopes([DependencyScope::Compile]);
        assert!(f.accept(&Relationship::parent(pvr("a"), pvr("b"))));
        assert!(!f.accept(&Relationship::placeholder_parent(&pvr("a"))));
        assert!(!f.accept(&plugin("a", "p")));
    }

    #[test]
    fn parent_chain_excludes_placeholders_by_default() {
        let f = RelationshipFilter::parent_chain();
        assert!(f.accept(&Relationship::parent(pvr("a"), pvr("b"))));
        assert!(!f.accept(&Relationship::placeholder_parent(&pvr("a"))));
        assert!(!f.accept(&dep("a", "b", DependencyScope::Compile)));

        let inclusive = RelationshipFilter::ParentChain {
            include_placeholder: true,
        };
        assert!(inclusive.accept(&Relationship::placeholder_parent(&pvr("a"))));
    }

    #[test]
    fn child_of_composition_is_composition_of_children() {
        let or = RelationshipFilter::or([
            RelationshipFilter::scopes([DependencyScope::Test]),
            RelationshipFilter::parent_chain(),
        ]);
        let hop = dep("root", "a", DependencyScope::Test);
        let child = or.child_filter(&hop);

        let expected = RelationshipFilter::or([
            RelationshipFilter::scopes([DependencyScope::Test]).child_filter(&hop),
            RelationshipFilter::parent_chain().child_filter(&hop),
        ]);
        assert_eq!(child, expected);
    }

    #[test]
    fn managed_and_concrete_interest() {
        let managed_only = RelationshipFilter::kinds([RelationshipKind::ManagedDependency]);
        assert!(managed_only.include_managed());
        assert!(!managed_only.include_concrete());

        let mixed = RelationshipFilter::kinds([
            RelationshipKind::ManagedDependency,
            RelationshipKind::Dependency,
        ]);
        assert!(mixed.include_managed());
        assert!(mixed.include_concrete());
    }

    #[test]
    fn condensed_ids_are_structural() {
        let a = RelationshipFilter::or([
            RelationshipFilter::kinds([RelationshipKind::Dependency]),
            RelationshipFilter::parent_chain(),
        ]);
        let b = RelationshipFilter::or([
            RelationshipFilter::kinds([RelationshipKind::Dependency]),
            RelationshipFilter::parent_chain(),
        ]);
        assert_eq!(a.condensed_id(), b.condensed_id());
        assert_ne!(
            a.condensed_id(),
            RelationshipFilter::Any.condensed_id()
        );
    }
}
