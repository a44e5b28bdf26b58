//! SQLite interaction store and failed-lookup log.
//!
//! Both tables live in the same file. Opening a store applies the schema,
//! which is idempotent, so any number of connections may open the same path.

mod failed_lookups;
mod interactions;
mod pool;
mod schema;

pub use pool::*;
pub use schema::*;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored row violates a constraint: {0}")]
    Constraint(String),

    #[error("Connection pool is closed")]
    PoolClosed,
}

pub type DbResult<T> = Result<T, DbError>;

/// One connection to the store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::with_schema(conn)
    }

    /// Private in-memory store. Nothing is shared between two of these.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(FAILED_LOOKUPS_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}
