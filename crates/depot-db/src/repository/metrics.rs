//! Blob store metrics queries.

use diesel::prelude::*;

use crate::{models::metrics::BlobStoreMetrics, schema::blob::blob_store_metrics};

/// Repository for per-store metrics rows.
pub struct MetricsRepository;

impl MetricsRepository {
    pub fn find(conn: &mut SqliteConnection, store: &str) -> QueryResult<Option<BlobStoreMetrics>> {
        blob_store_metrics::table
            .filter(blob_store_metrics::blob_store_name.eq(store))
            .select(BlobStoreMetrics::as_select())
            .first(conn)
            .optional()
    }

    pub fn list_all(conn: &mut SqliteConnection) -> QueryResult<Vec<BlobStoreMetrics>> {
        blob_store_metrics::table
            .order(blob_store_metrics::blob_store_name.asc())
            .select(BlobStoreMetrics::as_select())
            .load(conn)
    }

    /// Inserts a new row. Fails with a unique violation when the row already exists.
    pub fn insert(conn: &mut SqliteConnection, metrics: &BlobStoreMetrics) -> QueryResult<usize> {
        diesel::insert_into(blob_store_metrics::table)
            .values(metrics)
            .execute(conn)
    }

    /// Adds every counter of `delta` onto the stored row of `delta.blob_store_name`.
    ///
    /// Returns the number of rows touched, `0` when the store has no row yet.
    pub fn add(conn: &mut SqliteConnection, delta: &BlobStoreMetrics) -> QueryResult<usize> {
        use blob_store_metrics::*;

        diesel::update(table.filter(blob_store_name.eq(&delta.blob_store_name)))
            .set((
                blob_count.eq(blob_count + delta.blob_count),
                total_size.eq(total_size + delta.total_size),
                upload_count.eq(upload_count + delta.upload_count),
                upload_bytes.eq(upload_bytes + delta.upload_bytes),
                upload_errors.eq(upload_errors + delta.upload_errors),
                download_count.eq(download_count + delta.download_count),
                download_bytes.eq(download_bytes + delta.download_bytes),
                download_errors.eq(download_errors + delta.download_errors),
                delete_count.eq(delete_count + delta.delete_count),
                updated.eq(&delta.updated),
            ))
            .execute(conn)
    }

    /// Overwrites `blob_count` and `total_size`.
    pub fn set_counts(
        conn: &mut SqliteConnection,
        store: &str,
        count: i64,
        size: i64,
        updated_at: &str,
    ) -> QueryResult<usize> {
        use blob_store_metrics::*;

        diesel::update(table.filter(blob_store_name.eq(store)))
            .set((
                blob_count.eq(count),
                total_size.eq(size),
                updated.eq(updated_at),
            ))
            .execute(conn)
    }

    /// Zeroes the upload/download/delete counters, leaving count and size alone.
    pub fn reset_operations(
        conn: &mut SqliteConnection,
        store: &str,
        updated_at: &str,
    ) -> QueryResult<usize> {
        use blob_store_metrics::*;

        diesel::update(table.filter(blob_store_name.eq(store)))
            .set((
                upload_count.eq(0),
                upload_bytes.eq(0),
                upload_errors.eq(0),
                download_count.eq(0),
                download_bytes.eq(0),
                download_errors.eq(0),
                delete_count.eq(0),
                updated.eq(updated_at),
            ))
            .execute(conn)
    }

    pub fn delete(conn: &mut SqliteConnection, store: &str) -> QueryResult<usize> {
        diesel::delete(
            blob_store_metrics::table.filter(blob_store_metrics::blob_store_name.eq(store)),
        )
        .execute(conn)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::{connection::DbConnection, error::DbError, migration::DbType};

    fn open() -> (TempDir, DbConnection) {
        let dir = tempdir().unwrap();
        let db = DbConnection::open(dir.path().join("blob.db"), DbType::Blob).unwrap();
        (dir, db)
    }

    #[test]
    fn test_add_accumulates() {
        let (_dir, mut db) = open();
        MetricsRepository::insert(db.conn(), &BlobStoreMetrics::new("default")).unwrap();

        let delta = BlobStoreMetrics {
            blob_count: 1,
            total_size: 10,
            upload_count: 1,
            upload_bytes: 10,
            updated: "t1".into(),
            ..BlobStoreMetrics::new("default")
        };
        assert_eq!(MetricsRepository::add(db.conn(), &delta).unwrap(), 1);
        assert_eq!(MetricsRepository::add(db.conn(), &delta).unwrap(), 1);

        let row = MetricsRepository::find(db.conn(), "default").unwrap().unwrap();
        assert_eq!(row.blob_count, 2);
        assert_eq!(row.total_size, 20);
        assert_eq!(row.upload_count, 2);
        assert_eq!(row.updated, "t1");
    }

    #[test]
    fn test_add_without_row_touches_nothing() {
        let (_dir, mut db) = open();
        let delta = BlobStoreMetrics {
            blob_count: 1,
            ..BlobStoreMetrics::new("missing")
        };
        assert_eq!(MetricsRepository::add(db.conn(), &delta).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_insert_is_unique_violation() {
        let (_dir, mut db) = open();
        MetricsRepository::insert(db.conn(), &BlobStoreMetrics::new("default")).unwrap();
        let err = MetricsRepository::insert(db.conn(), &BlobStoreMetrics::new("default"))
            .unwrap_err();
        assert!(DbError::from(err).is_duplicate_key());
    }

    #[test]
    fn test_reset_operations_keeps_counts() {
        let (_dir, mut db) = open();
        let row = BlobStoreMetrics {
            blob_count: 3,
            total_size: 30,
            download_count: 7,
            delete_count: 2,
            ..BlobStoreMetrics::new("default")
        };
        MetricsRepository::insert(db.conn(), &row).unwrap();
        MetricsRepository::reset_operations(db.conn(), "default", "t2").unwrap();

        let row = MetricsRepository::find(db.conn(), "default").unwrap().unwrap();
        assert_eq!(row.blob_count, 3);
        assert_eq!(row.total_size, 30);
        assert_eq!(row.download_count, 0);
        assert_eq!(row.delete_count, 0);
    }

    #[test]
    fn test_delete_then_find_is_none() {
        let (_dir, mut db) = open();
        MetricsRepository::insert(db.conn(), &BlobStoreMetrics::new("default")).unwrap();
        assert_eq!(MetricsRepository::delete(db.conn(), "default").unwrap(), 1);
        assert_eq!(MetricsRepository::delete(db.conn(), "default").unwrap(), 0);
        assert!(MetricsRepository::find(db.conn(), "default").unwrap().is_none());
    }
}
