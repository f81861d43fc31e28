//! Marker database connection management.

use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ttl_markers (
        key TEXT PRIMARY KEY,
        remembered_at TEXT NOT NULL,
        expires_at_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_ttl_markers_expires ON ttl_markers(expires_at_ms);";

/// Marker database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct MarkerDb {
    pub(crate) conn: Connection,
}

impl MarkerDb {
    /// Open the marker database at the specified path.
    ///
    /// Creates the file and the marker table if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory marker database.
    ///
    /// Markers then last for the process lifetime only.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        Ok(Self { conn })
    }
}
