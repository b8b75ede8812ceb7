//! Opening the page store.
//!
//! Every handle runs with WAL journaling, enforced foreign keys (sections
//! cascade with their page) and a busy timeout, then migrates to the latest
//! schema before it is handed out.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;
     PRAGMA busy_timeout=5000;";

/// Page store handle.
///
/// Cloning shares one background connection, so all writes from this process
/// are serialized through it.
#[derive(Clone, Debug)]
pub struct PageDb {
    pub(crate) conn: Connection,
}

impl PageDb {
    /// Open (or create) the store file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        tracing::debug!(path = %path.display(), "opening page store");

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Private in-memory store, mostly for tests.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Schema version currently applied.
    pub async fn schema_version(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| -> Result<i64, Error> { migrations::schema_version(conn) })
            .await
            .map_err(Error::from)
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_is_migrated() {
        let db = PageDb::open_in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::latest_version());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = PageDb::open_in_memory().await.unwrap();
        let enabled: i64 = db
            .conn
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_open_file_twice_keeps_schema() {
        let path = std::env::temp_dir().join(format!("pagesync-open-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);

        PageDb::open(&path).await.unwrap();
        let reopened = PageDb::open(&path).await.unwrap();
        assert_eq!(reopened.schema_version().await.unwrap(), migrations::latest_version());

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }
}
