//! Shared database handles.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use depot_db::{connection::DbConnection, error::DbError, migration::DbType};
use diesel::SqliteConnection;

use crate::{error::DepotError, DepotResult};

/// Thread-safe wrapper around one [`DbConnection`].
///
/// Clones share the connection. Two handles opened separately on the same file behave like
/// two cluster nodes and only see each other through SQLite locking.
pub struct DieselDatabase {
    conn: Arc<Mutex<DbConnection>>,
}

impl DieselDatabase {
    fn open<P: AsRef<Path>>(path: P, db_type: DbType) -> DepotResult<Self> {
        let conn = DbConnection::open(path, db_type).map_err(DbError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens the ledger/metrics database with migrations.
    pub fn open_blob<P: AsRef<Path>>(path: P) -> DepotResult<Self> {
        Self::open(path, DbType::Blob)
    }

    /// Opens the content metadata database with migrations.
    pub fn open_content<P: AsRef<Path>>(path: P) -> DepotResult<Self> {
        Self::open(path, DbType::Content)
    }

    /// Locks the mutex and returns a guard.
    pub fn conn(&self) -> DepotResult<MutexGuard<'_, DbConnection>> {
        self.conn.lock().map_err(|_| DepotError::PoisonError)
    }

    /// Runs `f` on the connection outside of any explicit transaction.
    pub fn with_conn<F, T, E>(&self, f: F) -> DepotResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, E>,
        DepotError: From<E>,
    {
        let mut conn = self.conn()?;
        Ok(f(conn.conn())?)
    }

    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front so concurrent writers queue on the busy timeout
    /// instead of failing on lock upgrade.
    pub fn transaction<F, T, E>(&self, f: F) -> DepotResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, E>,
        DepotError: From<E>,
    {
        let mut conn = self.conn()?;
        conn.conn()
            .immediate_transaction(|tx| f(tx).map_err(DepotError::from))
    }
}

impl Clone for DieselDatabase {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}
