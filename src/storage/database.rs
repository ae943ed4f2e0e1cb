//! SQLite database handle
//!
//! Holds only the file path and connection settings. Every store operation
//! opens its own connection through [`Database::connect`] and drops it when
//! done; no session outlives a call.

use super::error::StoreResult;
use super::locks::SeriesLocks;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const CREATE_METADATA: &str = "
    CREATE TABLE IF NOT EXISTS Metadata (
        series_id TEXT PRIMARY KEY,
        msr TEXT NOT NULL,
        msr_attribute TEXT NOT NULL,
        object_id TEXT NOT NULL,
        object_type TEXT,
        cfg TEXT,
        device TEXT,
        number TEXT,
        object_description TEXT,
        object_name TEXT,
        unit TEXT,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        raster_size INTEGER NOT NULL,
        raster_unit TEXT NOT NULL,
        scale INTEGER NOT NULL
    )";

const CREATE_DATA: &str = "
    CREATE TABLE IF NOT EXISTS Data (
        data_id INTEGER PRIMARY KEY AUTOINCREMENT,
        series_id TEXT NOT NULL,
        date DATETIME,
        mean REAL,
        status TEXT,
        FOREIGN KEY(series_id) REFERENCES Metadata(series_id)
    )";

const CREATE_DATA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_data_series_date ON Data(series_id, date)";

/// Default time a connection waits on a locked database
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Handle to the measurement database file
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
    locks: Arc<SeriesLocks>,
}

impl Database {
    /// Create a handle for the database at `path`, creating parent directories
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            path,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            locks: Arc::new(SeriesLocks::new()),
        })
    }

    /// Builder method: set how long a connection waits on a locked database
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-series write locks shared by every clone of this handle
    pub fn locks(&self) -> &SeriesLocks {
        &self.locks
    }

    /// Open a fresh connection with foreign keys enforced
    pub fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(conn)
    }

    /// Create the Metadata and Data relations if absent. Idempotent.
    pub fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute(CREATE_METADATA, [])?;
        conn.execute(CREATE_DATA, [])?;
        conn.execute(CREATE_DATA_INDEX, [])?;

        tracing::info!(path = %self.path.display(), "Schema ensured");
        Ok(())
    }

    /// Drop both relations, Data first
    pub fn drop_schema(&self) -> StoreResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DROP TABLE IF EXISTS Data", [])?;
        tx.execute("DROP TABLE IF EXISTS Metadata", [])?;
        tx.commit()?;

        tracing::warn!(path = %self.path.display(), "Schema dropped");
        Ok(())
    }

    /// Open a connection and run a trivial statement
    pub fn ping(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
