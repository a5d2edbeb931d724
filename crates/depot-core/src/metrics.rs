//! Per-store blob metrics.
//!
//! Rows are keyed by blob store name and every call touches exactly one store. Counters are
//! applied as deltas inside an immediate transaction so that concurrent writers on other
//! connections serialize on the database lock instead of overwriting each other.

use depot_db::{
    error::DbError, models::metrics::BlobStoreMetrics, repository::metrics::MetricsRepository,
};
use tracing::{debug, trace};

use crate::{database::connection::DieselDatabase, timestamp, DepotResult};

pub trait BlobStoreMetricsStore: Send + Sync {
    /// Adds every counter of `delta` onto the row of `delta.blob_store_name`, creating the row
    /// when missing.
    fn update_metrics(&self, delta: &BlobStoreMetrics) -> DepotResult<()>;

    fn get(&self, store: &str) -> DepotResult<Option<BlobStoreMetrics>>;

    fn list(&self) -> DepotResult<Vec<BlobStoreMetrics>>;

    /// Drops the row. Returns `false` when there was none.
    fn remove(&self, store: &str) -> DepotResult<bool>;

    /// Creates a zeroed row. Losing the creation race to another writer is not an error.
    fn initialize_metrics(&self, store: &str) -> DepotResult<()>;

    /// Zeroes upload, download and delete counters.
    fn clear_operation_metrics(&self, store: &str) -> DepotResult<()>;

    /// Zeroes `blob_count` and `total_size`.
    fn clear_count_metrics(&self, store: &str) -> DepotResult<()>;

    /// Overwrites `blob_count` and `total_size` with freshly computed values, creating the row
    /// when missing.
    fn set_count_metrics(&self, store: &str, blob_count: i64, total_size: i64) -> DepotResult<()>;
}

pub struct SqlBlobStoreMetricsStore {
    db: DieselDatabase,
}

impl SqlBlobStoreMetricsStore {
    pub fn new(db: DieselDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl BlobStoreMetricsStore for SqlBlobStoreMetricsStore {
    fn update_metrics(&self, delta: &BlobStoreMetrics) -> DepotResult<()> {
        let delta = BlobStoreMetrics {
            updated: timestamp(),
            ..delta.clone()
        };

        self.db.transaction(|conn| {
            if MetricsRepository::add(conn, &delta)? == 0 {
                MetricsRepository::insert(conn, &BlobStoreMetrics::new(&delta.blob_store_name))?;
                MetricsRepository::add(conn, &delta)?;
            }
            Ok::<_, diesel::result::Error>(())
        })?;

        trace!(
            store = %delta.blob_store_name,
            blob_count = delta.blob_count,
            total_size = delta.total_size,
            "applied metrics delta"
        );
        Ok(())
    }

    fn get(&self, store: &str) -> DepotResult<Option<BlobStoreMetrics>> {
        self.db.with_conn(|conn| MetricsRepository::find(conn, store))
    }

    fn list(&self) -> DepotResult<Vec<BlobStoreMetrics>> {
        self.db.with_conn(MetricsRepository::list_all)
    }

    fn remove(&self, store: &str) -> DepotResult<bool> {
        let removed = self
            .db
            .transaction(|conn| MetricsRepository::delete(conn, store))?;
        Ok(removed > 0)
    }

    fn initialize_metrics(&self, store: &str) -> DepotResult<()> {
        let row = BlobStoreMetrics {
            updated: timestamp(),
            ..BlobStoreMetrics::new(store)
        };

        match self
            .db
            .transaction(|conn| MetricsRepository::insert(conn, &row))
        {
            Ok(_) => {
                debug!(store, "initialized blob store metrics");
                return Ok(());
            }
            Err(err) if err.is_duplicate_key() => {
                debug!(store, "blob store metrics already initialized by another writer");
            }
            Err(err) => return Err(err),
        }

        // The row the winner wrote is trusted as is; reconcile recomputes it from disk.
        match self.get(store)? {
            Some(_) => Ok(()),
            None => Err(DbError::NotFound(format!("metrics row for blob store '{store}'")).into()),
        }
    }

    fn clear_operation_metrics(&self, store: &str) -> DepotResult<()> {
        let updated = timestamp();
        self.db
            .transaction(|conn| MetricsRepository::reset_operations(conn, store, &updated))?;
        Ok(())
    }

    fn clear_count_metrics(&self, store: &str) -> DepotResult<()> {
        self.set_count_metrics(store, 0, 0)
    }

    fn set_count_metrics(&self, store: &str, blob_count: i64, total_size: i64) -> DepotResult<()> {
        let updated = timestamp();
        self.db.transaction(|conn| {
            if MetricsRepository::set_counts(conn, store, blob_count, total_size, &updated)? == 0 {
                MetricsRepository::insert(
                    conn,
                    &BlobStoreMetrics {
                        blob_count,
                        total_size,
                        updated: updated.clone(),
                        ..BlobStoreMetrics::new(store)
                    },
                )?;
            }
            Ok::<_, diesel::result::Error>(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use tempfile::{tempdir, TempDir};

    use super::*;

    fn open() -> (TempDir, SqlBlobStoreMetricsStore) {
        let dir = tempdir().unwrap();
        let db = DieselDatabase::open_blob(dir.path().join("blob.db")).unwrap();
        (dir, SqlBlobStoreMetricsStore::new(db))
    }

    fn delta(store: &str, count: i64, size: i64) -> BlobStoreMetrics {
        BlobStoreMetrics {
            blob_count: count,
            total_size: size,
            ..BlobStoreMetrics::new(store)
        }
    }

    #[test]
    fn test_update_creates_missing_row() {
        let (_dir, metrics) = open();
        metrics.update_metrics(&delta("default", 1, 100)).unwrap();

        let row = metrics.get("default").unwrap().unwrap();
        assert_eq!(row.blob_count, 1);
        assert_eq!(row.total_size, 100);
        assert!(!row.updated.is_empty());
    }

    #[test]
    fn test_update_accumulates_signed_deltas() {
        let (_dir, metrics) = open();
        metrics.initialize_metrics("default").unwrap();
        metrics.update_metrics(&delta("default", 2, 300)).unwrap();
        metrics.update_metrics(&delta("default", -1, -100)).unwrap();

        let row = metrics.get("default").unwrap().unwrap();
        assert_eq!(row.blob_count, 1);
        assert_eq!(row.total_size, 200);
    }

    #[test]
    fn test_stores_are_isolated() {
        let (_dir, metrics) = open();
        metrics.update_metrics(&delta("a", 1, 10)).unwrap();
        metrics.update_metrics(&delta("b", 5, 50)).unwrap();

        assert_eq!(metrics.get("a").unwrap().unwrap().blob_count, 1);
        assert_eq!(metrics.get("b").unwrap().unwrap().blob_count, 5);
        assert_eq!(metrics.list().unwrap().len(), 2);
    }

    #[test]
    fn test_initialize_twice_is_ok_and_keeps_counts() {
        let (_dir, metrics) = open();
        metrics.initialize_metrics("default").unwrap();
        metrics.update_metrics(&delta("default", 3, 30)).unwrap();
        metrics.initialize_metrics("default").unwrap();

        assert_eq!(metrics.get("default").unwrap().unwrap().blob_count, 3);
    }

    #[test]
    fn test_concurrent_initialize_from_separate_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.db");
        // Migrate once up front so the racing nodes only contend on the insert.
        drop(DieselDatabase::open_blob(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || {
                    let db = DieselDatabase::open_blob(&path).unwrap();
                    SqlBlobStoreMetricsStore::new(db).initialize_metrics("default")
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let db = DieselDatabase::open_blob(&path).unwrap();
        let rows = SqlBlobStoreMetricsStore::new(db).list().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let (_dir, metrics) = open();
        let metrics = Arc::new(metrics);
        metrics.initialize_metrics("default").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        metrics.update_metrics(&delta("default", 1, 1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let row = metrics.get("default").unwrap().unwrap();
        assert_eq!(row.blob_count, 80);
        assert_eq!(row.total_size, 80);
    }

    #[test]
    fn test_clear_operation_and_count_metrics() {
        let (_dir, metrics) = open();
        metrics
            .update_metrics(&BlobStoreMetrics {
                blob_count: 2,
                total_size: 20,
                download_count: 4,
                upload_errors: 1,
                ..BlobStoreMetrics::new("default")
            })
            .unwrap();

        metrics.clear_operation_metrics("default").unwrap();
        let row = metrics.get("default").unwrap().unwrap();
        assert_eq!((row.blob_count, row.download_count, row.upload_errors), (2, 0, 0));

        metrics.clear_count_metrics("default").unwrap();
        let row = metrics.get("default").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size), (0, 0));
    }

    #[test]
    fn test_remove() {
        let (_dir, metrics) = open();
        metrics.initialize_metrics("default").unwrap();
        assert!(metrics.remove("default").unwrap());
        assert!(!metrics.remove("default").unwrap());
        assert!(metrics.get("default").unwrap().is_none());
    }

    #[test]
    fn test_set_count_metrics_creates_missing_row() {
        let (_dir, metrics) = open();
        metrics.set_count_metrics("fresh", 3, 30).unwrap();
        let row = metrics.get("fresh").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size, row.upload_count), (3, 30, 0));

        metrics.set_count_metrics("fresh", 1, 10).unwrap();
        let row = metrics.get("fresh").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size), (1, 10));
    }
}
