//! Local SQLite store for mirrored entities.
//!
//! One store holds one entity's table. It is either file-backed (the cache
//! file) or in-memory for hosts without a writable cache directory. Access
//! goes through tokio-rusqlite, which runs statements on a background thread.

pub mod rows;
pub mod table;

use std::fmt;
use std::path::{Path, PathBuf};

use tokio_rusqlite::Connection;

use crate::Error;

pub use rows::{RowFilter, SqlRow, SqlValue};
pub use table::TableCreation;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::Memory => f.write_str(":memory:"),
        }
    }
}

/// Local store handle.
///
/// Cloning is cheap; clones share the same background connection.
#[derive(Clone, Debug)]
pub struct LocalStore {
    pub(crate) conn: Connection,
    location: StoreLocation,
}

impl LocalStore {
    /// Open a store at the specified path, creating the file if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).await.map_err(|e| Error::Database(e.into()))?;
        apply_pragmas(&conn).await?;

        Ok(Self { conn, location: StoreLocation::File(path) })
    }

    /// Open a transient, process-lifetime store.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        apply_pragmas(&conn).await?;

        Ok(Self { conn, location: StoreLocation::Memory })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Flush the write-ahead log into the main file.
    ///
    /// Called at the end of a rebuild so the file's mtime is not moved by a
    /// later checkpoint.
    pub async fn checkpoint(&self) -> Result<(), Error> {
        if self.location == StoreLocation::Memory {
            return Ok(());
        }

        self.conn
            .call(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(Error::Database)
    }
}

async fn apply_pragmas(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
    })
    .await
    .map_err(Error::Database)
}

/// Quote an identifier for use in SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
