//! Fixed-size connection pool for the interaction store.
//!
//! A connection is checked out with [`DatabasePool::acquire`] and handed back
//! when the returned [`PooledDatabase`] is dropped, so it is released on every
//! exit path of the holder, including an error return or a cancelled future.

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};

use super::{Database, DbError, DbResult};

type Slot = Arc<AsyncMutex<Database>>;

/// Pool of SQLite connections guarded by a semaphore.
pub struct DatabasePool {
    idle: Mutex<Vec<Slot>>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl DatabasePool {
    /// Open `size` connections to the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P, size: usize) -> DbResult<Arc<Self>> {
        let size = size.max(1);
        let mut databases = Vec::with_capacity(size);
        for _ in 0..size {
            databases.push(Database::open(path.as_ref())?);
        }
        tracing::debug!(path = %path.as_ref().display(), size, "Opened interaction store pool");
        Ok(Self::from_databases(databases))
    }

    /// Build a pool from already-open connections.
    pub fn from_databases(databases: Vec<Database>) -> Arc<Self> {
        let size = databases.len();
        let idle = databases
            .into_iter()
            .map(|db| Arc::new(AsyncMutex::new(db)))
            .collect();
        Arc::new(Self {
            idle: Mutex::new(idle),
            permits: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    /// Wait for a free connection.
    pub async fn acquire(self: &Arc<Self>) -> DbResult<PooledDatabase> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DbError::PoolClosed)?;

        // A held permit guarantees an idle slot
        let slot = self.idle.lock().pop().ok_or(DbError::PoolClosed)?;
        let conn = Arc::clone(&slot).lock_owned().await;

        Ok(PooledDatabase {
            conn,
            slot,
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Total number of connections.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections not currently checked out.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop handing out connections. Pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.permits.close();
    }
}

/// A checked-out connection. Returned to the pool on drop.
pub struct PooledDatabase {
    conn: OwnedMutexGuard<Database>,
    slot: Slot,
    pool: Arc<DatabasePool>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledDatabase {
    type Target = Database;

    fn deref(&self) -> &Database {
        &self.conn
    }
}

impl DerefMut for PooledDatabase {
    fn deref_mut(&mut self) -> &mut Database {
        &mut self.conn
    }
}

impl Drop for PooledDatabase {
    fn drop(&mut self) {
        // Slot goes back before the permit is released
        self.pool.idle.lock().push(Arc::clone(&self.slot));
    }
}
