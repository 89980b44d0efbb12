//! Root key of an effective graph: the root coordinate plus the build
//! facts (active profiles) the graph was materialized under. Two graphs of
//! the same project under different profile sets are different graphs.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ident::ProjectVersionRef;

/// Build-profile facts active when the graph was materialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphFacts {
    active_profiles: BTreeSet<String>,
}

impl GraphFacts {
    #[must_use]
    pub fn new<I, S>(active_profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_profiles: active_profiles.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub const fn active_profiles(&self) -> &BTreeSet<String> {
        &self.active_profiles
    }
}

impl fmt::Display for GraphFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profiles[")?;
        for (i, profile) in self.active_profiles.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{profile}")?;
        }
        write!(f, "]")
    }
}

/// Root coordinate + facts identifying one effective graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    project: ProjectVersionRef,
    facts: GraphFacts,
}

impl ProjectKey {
    #[must_use]
    pub const fn new(project: ProjectVersionRef, facts: GraphFacts) -> Self {
        Self { project, facts }
    }

    /// A key with no active profiles.
    #[must_use]
    pub fn plain(project: ProjectVersionRef) -> Self {
        Self::new(project, GraphFacts::default())
    }

    #[must_use]
    pub const fn project(&self) -> &ProjectVersionRef {
        &self.project
    }

    #[must_use]
    pub const fn facts(&self) -> &GraphFacts {
        &self.facts
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.project, self.facts)
    }
}
