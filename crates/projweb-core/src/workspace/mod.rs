//! Graph workspaces: session-scoped version selections over the shared
//! relationship set.
//!
//! # Overview
//!
//! A workspace never copies edges. It holds two selection maps — exact
//! coordinate → concrete version, and group+artifact wildcard → concrete
//! version — plus configuration (active profiles, source list). Concurrent
//! workspaces over the same store are isolated: a selection in one never
//! changes what another observes.
//!
//! A workspace marked temporary is deleted from the store when closed;
//! otherwise closing flushes it. Last-access time is bumped on every read
//! as a hook for a future expiration policy — no expiration logic lives
//! here.

pub mod view;

pub use view::GraphView;

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ident::{ProjectRef, ProjectVersionRef, SingleVersion};

/// Configuration a workspace is created from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub active_profiles: BTreeSet<String>,
    /// Origin descriptors/repositories this workspace draws from.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One session's lens over the graph: id, config, version selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    id: String,
    config: WorkspaceConfig,
    #[serde(with = "selection_pairs")]
    selections: BTreeMap<ProjectVersionRef, SingleVersion>,
    #[serde(with = "selection_pairs")]
    wildcard_selections: BTreeMap<ProjectRef, SingleVersion>,
    temporary: bool,
    last_access_us: i64,
}

impl Workspace {
    #[must_use]
    pub fn new(id: impl Into<String>, config: WorkspaceConfig) -> Self {
        Self {
            id: id.into(),
            config,
            selections: BTreeMap::new(),
            wildcard_selections: BTreeMap::new(),
            temporary: false,
            last_access_us: now_us(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Mark this workspace for deletion-on-close.
    pub const fn mark_temporary(&mut self) {
        self.temporary = true;
    }

    #[must_use]
    pub const fn last_access_us(&self) -> i64 {
        self.last_access_us
    }

    /// Bump the last-access timestamp. Called by every read path.
    pub fn touch(&mut self) {
        self.last_access_us = now_us();
    }

    /// Pin an exact coordinate to one concrete version. Replaces any
    /// previous pin for the same coordinate.
    pub fn select_version(&mut self, target: ProjectVersionRef, version: SingleVersion) {
        self.touch();
        self.selections.insert(target, version);
    }

    /// Pin every coordinate sharing `target`'s group+artifact. Exact pins
    /// still win over this.
    pub fn select_version_for_all(&mut self, target: ProjectRef, version: SingleVersion) {
        self.touch();
        self.wildcard_selections.insert(target, version);
    }

    /// Drop every selection, reverting affected coordinates to their
    /// unresolved classification.
    pub fn clear_selections(&mut self) {
        self.touch();
        self.selections.clear();
        self.wildcard_selections.clear();
    }

    /// Resolve a coordinate's effective version under this workspace's
    /// selections. Exact pins take precedence over wildcard pins; an
    /// unpinned coordinate resolves to itself (variable stays variable).
    pub fn resolve_version(&mut self, target: &ProjectVersionRef) -> ProjectVersionRef {
        self.touch();
        if let Some(version) = self.selections.get(target) {
            return target.pinned_to(version.clone());
        }
        if let Some(version) = self.wildcard_selections.get(target.project()) {
            return target.pinned_to(version.clone());
        }
        target.clone()
    }

    /// The pinned version for an exact coordinate, if any (wildcard pins
    /// included).
    pub fn selected_version(&mut self, target: &ProjectVersionRef) -> Option<SingleVersion> {
        self.touch();
        self.selections
            .get(target)
            .or_else(|| self.wildcard_selections.get(target.project()))
            .cloned()
    }

    #[must_use]
    pub const fn selections(&self) -> &BTreeMap<ProjectVersionRef, SingleVersion> {
        &self.selections
    }

    #[must_use]
    pub const fn wildcard_selections(&self) -> &BTreeMap<ProjectRef, SingleVersion> {
        &self.wildcard_selections
    }
}

/// Selection maps are keyed by structured refs, which JSON cannot use as
/// object keys — serialize them as sequences of `(key, version)` pairs.
mod selection_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Vec::<(K, V)>::deserialize(deserializer).map(|pairs| pairs.into_iter().collect())
    }
}

fn now_us() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
}
