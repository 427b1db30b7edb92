//! SQLite store holding the work list, case details, archival records and
//! the artifact index. Table names are configurable; see [`TableNames`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::TableNames;

pub mod case_repo;
pub mod error;
pub mod migrations;
pub mod record_repo;

pub use error::DatabaseError;

/// Shared handle to the archive store.
///
/// Clones share one connection; each repository call holds the lock for a
/// single statement or a single transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    tables: Arc<TableNames>,
}

impl Database {
    /// Opens (or creates) the database at the given path and ensures the
    /// configured tables exist.
    pub fn open(path: &Path, tables: TableNames) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

        migrations::run_all(&conn, &tables)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tables: Arc::new(tables),
        })
    }

    /// Opens an in-memory database for testing.
    pub fn open_in_memory(tables: TableNames) -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;

        migrations::run_all(&conn, &tables)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tables: Arc::new(tables),
        })
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Runs `f` with the connection locked.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// Local wall-clock time in the `YYYY-MM-DD HH:MM:SS` form the tables store.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Builds `?1, ?2, ...` placeholders for an `IN (...)` clause.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
