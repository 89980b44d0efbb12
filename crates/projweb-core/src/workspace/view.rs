//! Session-scoped graph views.
//!
//! A view is a stateless lens: workspace id, optional filter, optional
//! explicit root set. It never stores edges — stores apply it at query
//! time. The global view has none of the three.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::filter::RelationshipFilter;
use crate::ident::ProjectVersionRef;
use crate::rel::Relationship;

use super::Workspace;

/// A projection over the shared relationship set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    workspace_id: Option<String>,
    filter: Option<RelationshipFilter>,
    roots: BTreeSet<ProjectVersionRef>,
}

impl GraphView {
    /// The unscoped view: every edge, every vertex, no workspace.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// A view scoped to one workspace's selections.
    #[must_use]
    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self {
            workspace_id: Some(workspace.id().to_string()),
            filter: None,
            roots: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: RelationshipFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_roots(mut self, roots: impl IntoIterator<Item = ProjectVersionRef>) -> Self {
        self.roots = roots.into_iter().collect();
        self
    }

    #[must_use]
    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&RelationshipFilter> {
        self.filter.as_ref()
    }

    #[must_use]
    pub const fn roots(&self) -> &BTreeSet<ProjectVersionRef> {
        &self.roots
    }

    /// Root-level filter acceptance for one edge. Path-dependent filter
    /// state is the traversal engine's concern, not the view's.
    #[must_use]
    pub fn accepts(&self, rel: &Relationship) -> bool {
        self.filter.as_ref().is_none_or(|f| f.accept(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::GraphView;
    use crate::filter::RelationshipFilter;
    use crate::ident::{ProjectRef, ProjectVersionRef, SingleVersion};
    use crate::rel::{Relationship, RelationshipKind};

    fn pvr(artifact: &str) -> ProjectVersionRef {
        ProjectRef::new("g", artifact).with_version(SingleVersion::new("1").expect("version"))
    }

    #[test]
    fn global_view_accepts_everything() {
        let view = GraphView::global();
        assert!(view.accepts(&Relationship::parent(pvr("a"), pvr("b"))));
        assert!(view.workspace_id().is_none());
        assert!(view.roots().is_empty());
    }

    #[test]
    fn filtered_view_gates_edges() {
        let view = GraphView::global()
            .with_filter(RelationshipFilter::kinds([RelationshipKind::Plugin]));
        assert!(!view.accepts(&Relationship::parent(pvr("a"), pvr("b"))));
        assert!(view.accepts(&Relationship::plugin(pvr("a"), pvr("p"), 0, false)));
    }
}
