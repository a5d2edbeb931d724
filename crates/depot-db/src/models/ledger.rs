use diesel::prelude::*;

use crate::schema::blob::soft_deleted_blobs;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = soft_deleted_blobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SoftDeletedBlob {
    pub record_id: i64,
    pub source_blob_store_name: String,
    pub blob_id: String,
    pub deleted_date: String,
    pub date_path_ref: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = soft_deleted_blobs)]
pub struct NewSoftDeletedBlob<'a> {
    pub source_blob_store_name: &'a str,
    pub blob_id: &'a str,
    pub deleted_date: &'a str,
    pub date_path_ref: Option<&'a str>,
}
