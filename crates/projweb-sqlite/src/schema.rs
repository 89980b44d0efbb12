//! Canonical SQLite schema for the graph store.
//!
//! Edge identity lives in relational columns so inserts can deduplicate
//! with a UNIQUE constraint; the full typed edge rides along as a JSON
//! payload and is the only thing the read path decodes. Vertex-keyed
//! tables (`disconnected_projects`, `project_metadata`) carry the same
//! split: a display-form key column for lookups, a payload for decode.

/// Migration v1: relationship, vertex, workspace and metadata tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS relationships (
    rel_id INTEGER PRIMARY KEY AUTOINCREMENT,
    declaring TEXT NOT NULL CHECK (length(declaring) > 0),
    target TEXT NOT NULL CHECK (length(target) > 0),
    kind TEXT NOT NULL CHECK (length(kind) > 0),
    idx INTEGER NOT NULL CHECK (idx >= 0),
    target_concrete INTEGER NOT NULL CHECK (target_concrete IN (0, 1)),
    payload TEXT NOT NULL,
    UNIQUE (declaring, target, kind, idx)
);

CREATE INDEX IF NOT EXISTS idx_relationships_declaring ON relationships(declaring);
CREATE INDEX IF NOT EXISTS idx_relationships_target ON relationships(target);

CREATE TABLE IF NOT EXISTS disconnected_projects (
    project TEXT PRIMARY KEY,
    payload TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_metadata (
    project TEXT NOT NULL,
    key TEXT NOT NULL CHECK (length(trim(key)) > 0),
    value TEXT NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (project, key)
);

CREATE TABLE IF NOT EXISTS workspaces (
    workspace_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workspace_selections (
    workspace_id TEXT NOT NULL REFERENCES workspaces(workspace_id) ON DELETE CASCADE,
    target TEXT NOT NULL,
    wildcard INTEGER NOT NULL CHECK (wildcard IN (0, 1)),
    version TEXT NOT NULL,
    payload TEXT NOT NULL,
    PRIMARY KEY (workspace_id, target, wildcard)
);

CREATE TABLE IF NOT EXISTS graph_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    next_workspace INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO graph_meta (id, schema_version, next_workspace) VALUES (1, 1, 0);
";

/// Indexes the read path relies on.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_relationships_declaring",
    "idx_relationships_target",
];
