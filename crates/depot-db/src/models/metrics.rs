use diesel::prelude::*;
use serde::Serialize;

use crate::schema::blob::blob_store_metrics;

/// Aggregate metrics of one blob store.
///
/// The same shape doubles as a delta when passed to
/// [`MetricsRepository::add`](crate::repository::metrics::MetricsRepository::add): every
/// numeric field is added onto the stored row and `updated` is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = blob_store_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BlobStoreMetrics {
    pub blob_store_name: String,
    pub blob_count: i64,
    pub total_size: i64,
    pub upload_count: i64,
    pub upload_bytes: i64,
    pub upload_errors: i64,
    pub download_count: i64,
    pub download_bytes: i64,
    pub download_errors: i64,
    pub delete_count: i64,
    pub updated: String,
}

impl BlobStoreMetrics {
    pub fn new(blob_store_name: impl Into<String>) -> Self {
        Self {
            blob_store_name: blob_store_name.into(),
            ..Default::default()
        }
    }
}
