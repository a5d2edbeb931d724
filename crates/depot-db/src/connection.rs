//! Database connection management.
//!
//! depot keeps two SQLite files:
//!
//! - **Blob database**: soft-deleted blob ledger and per-store metrics
//! - **Content database**: components, asset blobs and assets
//!
//! Several processes may open the same file at once; each stands in for one node of a
//! cluster, so connections run in WAL mode with a busy timeout.

use std::path::{Path, PathBuf};

use diesel::{sql_query, Connection, ConnectionError, RunQueryDsl, SqliteConnection};

use crate::migration::{apply_migrations, DbType};

/// Milliseconds a writer waits on a locked database before giving up.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database connection wrapper with migration support.
pub struct DbConnection {
    conn: SqliteConnection,
}

impl DbConnection {
    /// Opens a database connection and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P, db_type: DbType) -> Result<Self, ConnectionError> {
        let path_str = path.as_ref().to_string_lossy();
        let mut conn = SqliteConnection::establish(&path_str)?;

        // busy_timeout first so that the WAL switch itself waits on concurrent openers
        for pragma in [
            format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"),
            "PRAGMA journal_mode = WAL;".to_string(),
            "PRAGMA synchronous = NORMAL;".to_string(),
            "PRAGMA foreign_keys = ON;".to_string(),
        ] {
            sql_query(pragma)
                .execute(&mut conn)
                .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        }

        apply_migrations(&mut conn, &db_type)
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl std::ops::Deref for DbConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// Paths of the database files under one directory.
#[derive(Debug, Clone)]
pub struct DatabasePaths {
    pub blob: PathBuf,
    pub content: PathBuf,
}

impl DatabasePaths {
    /// `{base_dir}/blob.db` and `{base_dir}/content.db`.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        let base = base_dir.as_ref();
        Self {
            blob: base.join("blob.db"),
            content: base.join("content.db"),
        }
    }
}
