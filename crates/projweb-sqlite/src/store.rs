//! The SQLite-backed [`GraphStore`] implementation.
//!
//! One connection behind a mutex. Writes are transactional; edge inserts
//! deduplicate on the relational identity columns with `INSERT OR
//! IGNORE`, so re-offering known edges is cheap and the newly-added
//! subset falls out of the changed-row count. Reads decode the JSON
//! payload column back into typed values and apply the view in Rust —
//! the view's filter is structural, not relational.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use projweb_core::ident::{ProjectRef, ProjectVersionRef, SingleVersion};
use projweb_core::rel::Relationship;
use projweb_core::store::{GraphStore, StoreError};
use projweb_core::workspace::{GraphView, Workspace, WorkspaceConfig};

use crate::{OpenError, migrations, open_connection};

/// Durable graph store over one SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, apply runtime pragmas,
    /// and migrate the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, configured, or
    /// migrated.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let mut conn = open_connection(path)?;
        migrations::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A throwaway in-memory store, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if schema migration fails.
    pub fn open_in_memory() -> Result<Self, OpenError> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn io(error: rusqlite::Error) -> StoreError {
    StoreError::Io(error.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Inconsistent(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Inconsistent(e.to_string()))
}

fn load_edges(conn: &Connection) -> Result<Vec<Relationship>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT payload FROM relationships ORDER BY rel_id")
        .map_err(io)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(io)?;
    let mut edges = Vec::new();
    for raw in rows {
        edges.push(decode(&raw.map_err(io)?)?);
    }
    Ok(edges)
}

fn load_disconnected(conn: &Connection) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT payload FROM disconnected_projects")
        .map_err(io)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(io)?;
    let mut projects = BTreeSet::new();
    for raw in rows {
        projects.insert(decode(&raw.map_err(io)?)?);
    }
    Ok(projects)
}

/// Vertices reachable from the view's roots over view-accepted edges;
/// `None` when the view carries no root restriction.
fn reachable(
    edges: &[Relationship],
    view: &GraphView,
) -> Option<BTreeSet<ProjectVersionRef>> {
    if view.roots().is_empty() {
        return None;
    }
    let mut seen: BTreeSet<ProjectVersionRef> = view.roots().iter().cloned().collect();
    let mut frontier: Vec<ProjectVersionRef> = seen.iter().cloned().collect();
    while let Some(vertex) = frontier.pop() {
        for rel in edges {
            if rel.declaring() == &vertex && view.accepts(rel) {
                let target = rel.target_project();
                if seen.insert(target.clone()) {
                    frontier.push(target.clone());
                }
            }
        }
    }
    Some(seen)
}

fn known_projects(
    edges: &[Relationship],
    disconnected: &BTreeSet<ProjectVersionRef>,
) -> BTreeSet<ProjectVersionRef> {
    let mut known = disconnected.clone();
    for rel in edges {
        known.insert(rel.declaring().clone());
        known.insert(rel.target_project().clone());
    }
    known
}

impl SqliteStore {
    /// Shared scan for the set-valued queries: (edges, disconnected,
    /// reachable-under-view).
    #[allow(clippy::type_complexity)]
    fn scan(
        &self,
        view: &GraphView,
    ) -> Result<
        (
            Vec<Relationship>,
            BTreeSet<ProjectVersionRef>,
            Option<BTreeSet<ProjectVersionRef>>,
        ),
        StoreError,
    > {
        let (edges, disconnected) = {
            let conn = self.lock();
            (load_edges(&conn)?, load_disconnected(&conn)?)
        };
        let visible = reachable(&edges, view);
        Ok((edges, disconnected, visible))
    }

    fn workspace_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE workspace_id = ?1)",
            [id],
            |row| row.get(0),
        )
        .map_err(io)
    }
}

impl GraphStore for SqliteStore {
    fn add_relationships(
        &self,
        rels: &[Relationship],
    ) -> Result<Vec<Relationship>, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(io)?;
        let mut added = Vec::new();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO relationships
                     (declaring, target, kind, idx, target_concrete, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(io)?;
            for rel in rels {
                let changed = stmt
                    .execute(params![
                        rel.declaring().to_string(),
                        rel.target_project().to_string(),
                        rel.kind().to_string(),
                        rel.index(),
                        i64::from(rel.target_project().is_concrete()),
                        encode(rel)?,
                    ])
                    .map_err(io)?;
                if changed > 0 {
                    added.push(rel.clone());
                }
            }
        }
        tx.commit().map_err(io)?;
        debug!(offered = rels.len(), added = added.len(), "stored relationships");
        Ok(added)
    }

    fn add_disconnected_project(&self, project: &ProjectVersionRef) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "INSERT OR IGNORE INTO disconnected_projects (project, payload)
                 VALUES (?1, ?2)",
                params![project.to_string(), encode(project)?],
            )
            .map_err(io)?;
        Ok(())
    }

    fn relationships_declared_by(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT payload FROM relationships WHERE declaring = ?1 ORDER BY rel_id",
            )
            .map_err(io)?;
        let rows = stmt
            .query_map([project.to_string()], |row| row.get::<_, String>(0))
            .map_err(io)?;
        let mut declared = Vec::new();
        let mut any = false;
        for raw in rows {
            any = true;
            let rel: Relationship = decode(&raw.map_err(io)?)?;
            if view.accepts(&rel) {
                declared.push(rel);
            }
        }
        if !any {
            let disconnected: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM disconnected_projects WHERE project = ?1)",
                    [project.to_string()],
                    |row| row.get(0),
                )
                .map_err(io)?;
            return Ok(disconnected.then(Vec::new));
        }
        Ok(Some(declared))
    }

    fn relationships_targeting(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<Option<Vec<Relationship>>, StoreError> {
        let conn = self.lock();
        let key = project.to_string();
        let known: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM relationships WHERE declaring = ?1 OR target = ?1)
                 OR EXISTS(SELECT 1 FROM disconnected_projects WHERE project = ?1)",
                [&key],
                |row| row.get(0),
            )
            .map_err(io)?;
        if !known {
            return Ok(None);
        }

        let mut stmt = conn
            .prepare("SELECT payload FROM relationships WHERE target = ?1 ORDER BY rel_id")
            .map_err(io)?;
        let rows = stmt
            .query_map([&key], |row| row.get::<_, String>(0))
            .map_err(io)?;
        let mut targeting = Vec::new();
        for raw in rows {
            let rel: Relationship = decode(&raw.map_err(io)?)?;
            if view.accepts(&rel) {
                targeting.push(rel);
            }
        }
        Ok(Some(targeting))
    }

    fn all_relationships(
        &self,
        view: &GraphView,
    ) -> Result<Option<Vec<Relationship>>, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        if edges.is_empty() && disconnected.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            edges
                .into_iter()
                .filter(|r| {
                    view.accepts(r)
                        && visible.as_ref().is_none_or(|set| set.contains(r.declaring()))
                })
                .collect(),
        ))
    }

    fn contains_project(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<bool, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        Ok(known_projects(&edges, &disconnected).contains(project)
            && visible.is_none_or(|set| set.contains(project)))
    }

    fn is_missing(
        &self,
        view: &GraphView,
        project: &ProjectVersionRef,
    ) -> Result<bool, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        Ok(known_projects(&edges, &disconnected).contains(project)
            && visible.is_none_or(|set| set.contains(project))
            && !disconnected.contains(project)
            && !edges.iter().any(|r| r.declaring() == project))
    }

    fn all_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        Ok(known_projects(&edges, &disconnected)
            .into_iter()
            .filter(|p| visible.as_ref().is_none_or(|set| set.contains(p)))
            .collect())
    }

    fn missing_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        let declares: BTreeSet<&ProjectVersionRef> =
            edges.iter().map(Relationship::declaring).collect();
        Ok(known_projects(&edges, &disconnected)
            .into_iter()
            .filter(|p| {
                !declares.contains(p)
                    && !disconnected.contains(p)
                    && visible.as_ref().is_none_or(|set| set.contains(p))
            })
            .collect())
    }

    fn variable_projects(
        &self,
        view: &GraphView,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        Ok(known_projects(&edges, &disconnected)
            .into_iter()
            .filter(|p| !p.is_concrete() && visible.as_ref().is_none_or(|set| set.contains(p)))
            .collect())
    }

    fn projects_matching(
        &self,
        view: &GraphView,
        project: &ProjectRef,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let (edges, disconnected, visible) = self.scan(view)?;
        Ok(known_projects(&edges, &disconnected)
            .into_iter()
            .filter(|p| {
                p.project() == project
                    && visible.as_ref().is_none_or(|set| set.contains(p))
            })
            .collect())
    }

    fn metadata(
        &self,
        project: &ProjectVersionRef,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT key, value FROM project_metadata WHERE project = ?1")
            .map_err(io)?;
        let rows = stmt
            .query_map([project.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(io)?;
        let mut metadata = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(io)?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }

    fn add_metadata(
        &self,
        project: &ProjectVersionRef,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "INSERT INTO project_metadata (project, key, value, payload)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(project, key) DO UPDATE SET value = excluded.value",
                params![project.to_string(), key, value, encode(project)?],
            )
            .map_err(io)?;
        Ok(())
    }

    fn set_metadata(
        &self,
        project: &ProjectVersionRef,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(io)?;
        tx.execute(
            "DELETE FROM project_metadata WHERE project = ?1",
            [project.to_string()],
        )
        .map_err(io)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO project_metadata (project, key, value, payload)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(io)?;
            for (key, value) in &metadata {
                stmt.execute(params![project.to_string(), key, value, encode(project)?])
                    .map_err(io)?;
            }
        }
        tx.commit().map_err(io)
    }

    fn projects_with_metadata(
        &self,
        view: &GraphView,
        key: &str,
    ) -> Result<BTreeSet<ProjectVersionRef>, StoreError> {
        let conn = self.lock();
        let visible = reachable(&load_edges(&conn)?, view);
        let mut stmt = conn
            .prepare("SELECT DISTINCT payload FROM project_metadata WHERE key = ?1")
            .map_err(io)?;
        let rows = stmt
            .query_map([key], |row| row.get::<_, String>(0))
            .map_err(io)?;
        let mut projects = BTreeSet::new();
        for raw in rows {
            let project: ProjectVersionRef = decode(&raw.map_err(io)?)?;
            if visible.as_ref().is_none_or(|set| set.contains(&project)) {
                projects.insert(project);
            }
        }
        Ok(projects)
    }

    fn create_workspace(&self, config: WorkspaceConfig) -> Result<Workspace, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(io)?;
        let n: i64 = tx
            .query_row(
                "UPDATE graph_meta SET next_workspace = next_workspace + 1
                 WHERE id = 1 RETURNING next_workspace",
                [],
                |row| row.get(0),
            )
            .map_err(io)?;
        let workspace = Workspace::new(format!("ws-{n}"), config);
        tx.execute(
            "INSERT INTO workspaces (workspace_id, payload) VALUES (?1, ?2)",
            params![workspace.id(), encode(&workspace)?],
        )
        .map_err(io)?;
        tx.commit().map_err(io)?;
        debug!(id = workspace.id(), "created workspace");
        Ok(workspace)
    }

    fn load_workspace(&self, id: &str) -> Result<Option<Workspace>, StoreError> {
        let conn = self.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT payload FROM workspaces WHERE workspace_id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(io)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let mut workspace: Workspace = decode(&raw)?;

        // Durable pins live in the selections table; overlay them so a
        // reload observes selections committed since the last flush.
        let mut stmt = conn
            .prepare(
                "SELECT wildcard, version, payload FROM workspace_selections
                 WHERE workspace_id = ?1",
            )
            .map_err(io)?;
        let rows = stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(io)?;
        for row in rows {
            let (wildcard, version, payload) = row.map_err(io)?;
            let version = SingleVersion::new(version).ok_or_else(|| {
                StoreError::Inconsistent(format!("empty selected version in workspace {id}"))
            })?;
            if wildcard == 0 {
                workspace.select_version(decode(&payload)?, version);
            } else {
                workspace.select_version_for_all(decode(&payload)?, version);
            }
        }
        Ok(Some(workspace))
    }

    fn store_workspace(&self, workspace: &Workspace) -> Result<(), StoreError> {
        let conn = self.lock();
        if !Self::workspace_exists(&conn, workspace.id())? {
            return Err(StoreError::WorkspaceNotFound(workspace.id().to_string()));
        }
        conn.execute(
            "UPDATE workspaces SET payload = ?2 WHERE workspace_id = ?1",
            params![workspace.id(), encode(workspace)?],
        )
        .map_err(io)?;
        Ok(())
    }

    fn delete_workspace(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(io)?;
        tx.execute(
            "DELETE FROM workspace_selections WHERE workspace_id = ?1",
            [id],
        )
        .map_err(io)?;
        let deleted = tx
            .execute("DELETE FROM workspaces WHERE workspace_id = ?1", [id])
            .map_err(io)?;
        tx.commit().map_err(io)?;
        Ok(deleted > 0)
    }

    fn all_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT payload FROM workspaces ORDER BY workspace_id")
            .map_err(io)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(io)?;
        let mut workspaces = Vec::new();
        for raw in rows {
            workspaces.push(decode(&raw.map_err(io)?)?);
        }
        Ok(workspaces)
    }

    fn select_version(
        &self,
        workspace_id: &str,
        project: &ProjectVersionRef,
        version: &SingleVersion,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        if !Self::workspace_exists(&conn, workspace_id)? {
            return Err(StoreError::WorkspaceNotFound(workspace_id.to_string()));
        }
        conn.execute(
            "INSERT INTO workspace_selections (workspace_id, target, wildcard, version, payload)
             VALUES (?1, ?2, 0, ?3, ?4)
             ON CONFLICT(workspace_id, target, wildcard) DO UPDATE SET version = excluded.version",
            params![
                workspace_id,
                project.to_string(),
                version.as_str(),
                encode(project)?
            ],
        )
        .map_err(io)?;
        Ok(())
    }

    fn select_version_for_all(
        &self,
        workspace_id: &str,
        project: &ProjectRef,
        version: &SingleVersion,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        if !Self::workspace_exists(&conn, workspace_id)? {
            return Err(StoreError::WorkspaceNotFound(workspace_id.to_string()));
        }
        conn.execute(
            "INSERT INTO workspace_selections (workspace_id, target, wildcard, version, payload)
             VALUES (?1, ?2, 1, ?3, ?4)
             ON CONFLICT(workspace_id, target, wildcard) DO UPDATE SET version = excluded.version",
            params![
                workspace_id,
                format!("{}:{}", project.group_id(), project.artifact_id()),
                version.as_str(),
                encode(project)?
            ],
        )
        .map_err(io)?;
        Ok(())
    }

    fn clear_selected_versions(&self, workspace_id: &str) -> Result<(), StoreError> {
        self.lock()
            .execute(
                "DELETE FROM workspace_selections WHERE workspace_id = ?1",
                [workspace_id],
            )
            .map_err(io)?;
        Ok(())
    }
}
