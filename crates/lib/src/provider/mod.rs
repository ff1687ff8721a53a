//! SQLite storage provider.
//!
//! Holds a [`turso::Database`] instance, which manages a connection pool.
//! When cloned, it shares the same underlying database, allowing concurrent
//! access to the same file or in-memory instance. Stores receive a clone of
//! this provider at construction time; there is no global registry.

use std::fmt::{self, Debug};

use turso::Database;

use crate::errors::StoreError;

mod sql;

#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. Cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new provider from a file path, or ":memory:" for a unique,
    /// isolated in-memory database. To share an in-memory database across
    /// multiple handles (e.g. in tests), create one provider and `.clone()`.
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| StoreError::StorageConnection(e.to_string()))?;

        // Enable WAL mode for better concurrency on file-based databases.
        // No effect in-memory, but safe to run.
        let conn = db
            .connect()
            .map_err(|e| StoreError::StorageConnection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| StoreError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    /// Ensures all application tables and indexes exist. Idempotent and safe
    /// to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| StoreError::StorageConnection(e.to_string()))?;

        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// A helper for tests to pre-populate data by executing multiple SQL
    /// statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), StoreError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| StoreError::StorageConnection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}
