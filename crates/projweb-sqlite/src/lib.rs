//! SQLite-backed graph store for projweb.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while writers append
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` to protect relational integrity

pub mod migrations;
pub mod schema;
pub mod store;

pub use store::SqliteStore;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

/// Busy timeout used for graph database connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure to open or prepare the graph database.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("create graph database directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("graph database error")]
    Sqlite(#[from] rusqlite::Error),
}

/// Open (or create) the graph database file and apply runtime pragmas.
/// Schema migration is the caller's job.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// database cannot be opened or configured.
pub fn open_connection(path: &Path) -> Result<Connection, OpenError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| OpenError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open(path)?;
    configure_connection(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
