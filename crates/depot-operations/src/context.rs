use std::sync::{Arc, OnceLock};

use depot_config::config::Config;
use depot_core::{
    blob::FileBlobStore,
    database::connection::DieselDatabase,
    error::DepotError,
    ledger::{SoftDeletedBlobStore, SqlSoftDeletedBlobStore},
    metrics::{BlobStoreMetricsStore, SqlBlobStoreMetricsStore},
    restore::RestoreStrategyRegistry,
    DepotResult,
};
use depot_db::connection::DatabasePaths;
use depot_events::EventSinkHandle;
use depot_utils::fs::ensure_dir_exists;
use tracing::debug;

/// Everything an operation needs: configuration, databases and where to send events.
///
/// Databases are opened on first use so that commands which only touch the config never
/// create database files.
pub struct DepotContext {
    config: Config,
    events: EventSinkHandle,
    blob_db: OnceLock<DieselDatabase>,
    content_db: OnceLock<DieselDatabase>,
}

impl DepotContext {
    pub fn new(config: Config, events: EventSinkHandle) -> Self {
        Self {
            config,
            events,
            blob_db: OnceLock::new(),
            content_db: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    fn database_paths(&self) -> DepotResult<DatabasePaths> {
        let db_dir = self.config.get_db_path()?;
        ensure_dir_exists(&db_dir)?;
        Ok(DatabasePaths::new(db_dir))
    }

    /// Ledger and metrics database.
    pub fn blob_db(&self) -> DepotResult<&DieselDatabase> {
        if let Some(db) = self.blob_db.get() {
            return Ok(db);
        }
        let path = self.database_paths()?.blob;
        debug!(path = %path.display(), "opening blob database");
        let db = DieselDatabase::open_blob(&path)?;
        Ok(self.blob_db.get_or_init(|| db))
    }

    /// Content metadata database.
    pub fn content_db(&self) -> DepotResult<&DieselDatabase> {
        if let Some(db) = self.content_db.get() {
            return Ok(db);
        }
        let path = self.database_paths()?.content;
        debug!(path = %path.display(), "opening content database");
        let db = DieselDatabase::open_content(&path)?;
        Ok(self.content_db.get_or_init(|| db))
    }

    pub fn metrics_store(&self) -> DepotResult<Arc<dyn BlobStoreMetricsStore>> {
        Ok(Arc::new(SqlBlobStoreMetricsStore::new(self.blob_db()?.clone())))
    }

    pub fn ledger(&self) -> DepotResult<Arc<dyn SoftDeletedBlobStore>> {
        Ok(Arc::new(SqlSoftDeletedBlobStore::new(self.blob_db()?.clone())))
    }

    /// Opens a configured blob store.
    pub fn open_store(&self, name: &str) -> DepotResult<FileBlobStore> {
        let root = self
            .config
            .get_blob_store_path(name)?
            .ok_or_else(|| DepotError::UnknownBlobStore(name.to_string()))?;
        Ok(FileBlobStore::new(
            name,
            root,
            self.metrics_store()?,
            self.ledger()?,
        ))
    }

    /// Restore strategies for every supported format.
    pub fn restore_strategies(&self) -> RestoreStrategyRegistry {
        RestoreStrategyRegistry::with_defaults(self.config.get_maven_packaging_extensions())
    }
}
