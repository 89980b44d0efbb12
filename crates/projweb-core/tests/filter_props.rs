//! Property tests for the filter algebra.

use std::collections::BTreeSet;

use proptest::prelude::*;

use projweb_core::{
    ArtifactRef, DependencyScope, ProjectRef, ProjectVersionRef, Relationship,
    RelationshipFilter, RelationshipKind, SingleVersion,
};

fn pvr(artifact: &str) -> ProjectVersionRef {
    ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
}

fn scope_strategy() -> impl Strategy<Value = DependencyScope> {
    prop_oneof![
        Just(DependencyScope::Compile),
        Just(DependencyScope::Provided),
        Just(DependencyScope::Runtime),
        Just(DependencyScope::Test),
        Just(DependencyScope::System),
        Just(DependencyScope::Import),
    ]
}

fn kind_strategy() -> impl Strategy<Value = RelationshipKind> {
    prop_oneof![
        Just(RelationshipKind::Parent),
        Just(RelationshipKind::Dependency),
        Just(RelationshipKind::ManagedDependency),
        Just(RelationshipKind::Extension),
        Just(RelationshipKind::Plugin),
        Just(RelationshipKind::ManagedPlugin),
        Just(RelationshipKind::PluginDependency),
    ]
}

prop_compose! {
    fn edge_strategy()(
        kind in kind_strategy(),
        scope in scope_strategy(),
        from in "[a-d]",
        to in "[e-h]",
        index in 0u32..4,
        placeholder in any::<bool>(),
    ) -> Relationship {
        match kind {
            RelationshipKind::Parent => {
                if placeholder {
                    Relationship::placeholder_parent(&pvr(&from))
                } else {
                    Relationship::parent(pvr(&from), pvr(&to))
                }
            }
            RelationshipKind::Dependency | RelationshipKind::ManagedDependency => {
                Relationship::dependency(
                    pvr(&from),
                    ArtifactRef::jar(pvr(&to)),
                    scope,
                    index,
                    kind == RelationshipKind::ManagedDependency,
                    BTreeSet::new(),
                )
            }
            RelationshipKind::Plugin | RelationshipKind::ManagedPlugin => {
                Relationship::plugin(
                    pvr(&from),
                    pvr(&to),
                    index,
                    kind == RelationshipKind::ManagedPlugin,
                )
            }
            RelationshipKind::Extension => Relationship::extension(pvr(&from), pvr(&to), index),
            RelationshipKind::PluginDependency => Relationship::plugin_dependency(
                pvr(&from),
                ProjectRef::new("g", "plug"),
                ArtifactRef::jar(pvr(&to)),
                index,
                false,
            ),
        }
    }
}

fn filter_strategy() -> impl Strategy<Value = RelationshipFilter> {
    let leaf = prop_oneof![
        Just(RelationshipFilter::Any),
        Just(RelationshipFilter::parent_chain()),
        Just(RelationshipFilter::ParentChain {
            include_placeholder: true
        }),
        proptest::collection::btree_set(kind_strategy(), 0..4).prop_map(RelationshipFilter::Kinds),
        proptest::collection::btree_set(scope_strategy(), 0..3)
            .prop_map(RelationshipFilter::scopes),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(RelationshipFilter::And),
            proptest::collection::vec(inner, 0..3).prop_map(RelationshipFilter::Or),
        ]
    })
}

proptest! {
    #[test]
    fn or_is_disjunction(
        branches in proptest::collection::vec(filter_strategy(), 0..4),
        edge in edge_strategy(),
    ) {
        let or = RelationshipFilter::Or(branches.clone());
        prop_assert_eq!(
            or.accept(&edge),
            branches.iter().any(|f| f.accept(&edge))
        );
    }

    #[test]
    fn and_is_conjunction(
        branches in proptest::collection::vec(filter_strategy(), 0..4),
        edge in edge_strategy(),
    ) {
        let and = RelationshipFilter::And(branches.clone());
        prop_assert_eq!(
            and.accept(&edge),
            branches.iter().all(|f| f.accept(&edge))
        );
    }

    #[test]
    fn accepted_edges_are_within_allowed_kinds(
        filter in filter_strategy(),
        edge in edge_strategy(),
    ) {
        if filter.accept(&edge) {
            prop_assert!(filter.allowed_kinds().contains(&edge.kind()));
        }
    }

    #[test]
    fn child_derivation_distributes_over_composition(
        branches in proptest::collection::vec(filter_strategy(), 0..4),
        hop in edge_strategy(),
        probe in edge_strategy(),
    ) {
        let or = RelationshipFilter::Or(branches.clone());
        let direct = or.child_filter(&hop);
        let distributed = RelationshipFilter::Or(
            branches.iter().map(|f| f.child_filter(&hop)).collect(),
        );
        prop_assert_eq!(direct.accept(&probe), distributed.accept(&probe));
    }

    #[test]
    fn child_derivation_is_deterministic(
        filter in filter_strategy(),
        hop in edge_strategy(),
    ) {
        prop_assert_eq!(filter.child_filter(&hop), filter.child_filter(&hop));
    }

    #[test]
    fn equal_condensed_ids_accept_identically(
        a in filter_strategy(),
        b in filter_strategy(),
        edge in edge_strategy(),
    ) {
        if a.condensed_id() == b.condensed_id() {
            prop_assert_eq!(a.accept(&edge), b.accept(&edge));
        }
    }

    #[test]
    fn scope_narrowing_reaches_a_fixed_point(
        scopes in proptest::collection::btree_set(scope_strategy(), 0..4),
        hops in proptest::collection::vec(edge_strategy(), 1..5),
        probe in edge_strategy(),
    ) {
        // After the first dependency hop the scope state must be stable.
        let mut state = RelationshipFilter::scopes(scopes);
        let mut past_first_dependency = false;
        for hop in &hops {
            let next = state.child_filter(hop);
            if past_first_dependency {
                prop_assert_eq!(next.accept(&probe), state.accept(&probe));
            }
            if hop.kind() == RelationshipKind::Dependency {
                past_first_dependency = true;
            }
            state = next;
        }
    }
}
