//! Soft-deleted blob ledger queries.

use diesel::{dsl::exists, prelude::*};

use crate::{
    models::ledger::{NewSoftDeletedBlob, SoftDeletedBlob},
    schema::blob::soft_deleted_blobs,
};

/// Repository for the soft-deleted blob ledger.
///
/// Every query is scoped to one blob store.
pub struct SoftDeletedBlobRepository;

impl SoftDeletedBlobRepository {
    /// Appends a record and returns its generated record id.
    pub fn insert(conn: &mut SqliteConnection, record: &NewSoftDeletedBlob) -> QueryResult<i64> {
        diesel::insert_into(soft_deleted_blobs::table)
            .values(record)
            .returning(soft_deleted_blobs::record_id)
            .get_result(conn)
    }

    /// Reads up to `limit` records with a record id strictly greater than `after`, ascending.
    pub fn page(
        conn: &mut SqliteConnection,
        store: &str,
        after: Option<i64>,
        limit: i64,
    ) -> QueryResult<Vec<SoftDeletedBlob>> {
        let mut query = soft_deleted_blobs::table
            .filter(soft_deleted_blobs::source_blob_store_name.eq(store))
            .into_boxed();

        if let Some(after) = after {
            query = query.filter(soft_deleted_blobs::record_id.gt(after));
        }

        query
            .order(soft_deleted_blobs::record_id.asc())
            .limit(limit)
            .select(SoftDeletedBlob::as_select())
            .load(conn)
    }

    /// Same keyset scan as [`Self::page`] but only loads `(record_id, blob_id)`.
    pub fn blob_ids_after(
        conn: &mut SqliteConnection,
        store: &str,
        after: i64,
        limit: i64,
    ) -> QueryResult<Vec<(i64, String)>> {
        soft_deleted_blobs::table
            .filter(soft_deleted_blobs::source_blob_store_name.eq(store))
            .filter(soft_deleted_blobs::record_id.gt(after))
            .order(soft_deleted_blobs::record_id.asc())
            .limit(limit)
            .select((soft_deleted_blobs::record_id, soft_deleted_blobs::blob_id))
            .load(conn)
    }

    /// Removes every record of `blob_id` in `store`; returns the number of rows removed.
    pub fn delete_by_blob_id(
        conn: &mut SqliteConnection,
        store: &str,
        blob_id: &str,
    ) -> QueryResult<usize> {
        diesel::delete(
            soft_deleted_blobs::table
                .filter(soft_deleted_blobs::source_blob_store_name.eq(store))
                .filter(soft_deleted_blobs::blob_id.eq(blob_id)),
        )
        .execute(conn)
    }

    pub fn delete_by_store(conn: &mut SqliteConnection, store: &str) -> QueryResult<usize> {
        diesel::delete(
            soft_deleted_blobs::table.filter(soft_deleted_blobs::source_blob_store_name.eq(store)),
        )
        .execute(conn)
    }

    pub fn count(conn: &mut SqliteConnection, store: &str) -> QueryResult<i64> {
        soft_deleted_blobs::table
            .filter(soft_deleted_blobs::source_blob_store_name.eq(store))
            .count()
            .get_result(conn)
    }

    /// Blob ids with the oldest deletion dates, ties broken by record id.
    pub fn oldest(
        conn: &mut SqliteConnection,
        store: &str,
        limit: i64,
    ) -> QueryResult<Vec<String>> {
        soft_deleted_blobs::table
            .filter(soft_deleted_blobs::source_blob_store_name.eq(store))
            .order((
                soft_deleted_blobs::deleted_date.asc(),
                soft_deleted_blobs::record_id.asc(),
            ))
            .limit(limit)
            .select(soft_deleted_blobs::blob_id)
            .load(conn)
    }

    pub fn exists(conn: &mut SqliteConnection, store: &str, blob_id: &str) -> QueryResult<bool> {
        diesel::select(exists(
            soft_deleted_blobs::table
                .filter(soft_deleted_blobs::source_blob_store_name.eq(store))
                .filter(soft_deleted_blobs::blob_id.eq(blob_id)),
        ))
        .get_result(conn)
    }
}
