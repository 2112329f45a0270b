pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

pub use error::{StoreError, StoreResult};

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Handle to the relational store. Holds the users and complaints tables.
///
/// Construct one at startup and share it (behind an `Arc`) with whatever
/// needs it. Opening never touches the schema; call [`Database::migrate`]
/// from the deployment step and [`Database::ensure_migrated`] before serving.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply pending migrations. Returns the schema version afterwards.
    pub fn migrate(&self) -> Result<i64> {
        let conn = self.lock()?;
        migrations::run(&conn)
    }

    /// Fails unless the schema is at the version this build expects.
    pub fn ensure_migrated(&self) -> Result<()> {
        let conn = self.lock()?;
        let version = migrations::current_version(&conn)?;
        if version < migrations::LATEST_VERSION {
            anyhow::bail!(
                "database schema is at version {} but {} is required; run `denuncias migrate` first",
                version,
                migrations::LATEST_VERSION
            );
        }
        Ok(())
    }

    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmigrated_database_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_migrated().is_err());

        db.migrate().unwrap();
        assert!(db.ensure_migrated().is_ok());
    }

    #[test]
    fn file_database_keeps_schema_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("denuncias.db");

        Database::open(&path).unwrap().migrate().unwrap();

        let reopened = Database::open(&path).unwrap();
        assert!(reopened.ensure_migrated().is_ok());
    }
}
