use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::schema::content::{asset_blobs, assets, components};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = components)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Component {
    pub id: i64,
    pub repository: String,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub kind: Option<String>,
    pub attributes: Value,
    pub created: String,
}

#[derive(Insertable)]
#[diesel(table_name = components)]
pub struct NewComponent<'a> {
    pub repository: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub kind: Option<&'a str>,
    pub attributes: Value,
    pub created: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = asset_blobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AssetBlob {
    pub id: i64,
    pub blob_ref: String,
    pub blob_size: i64,
    pub content_type: String,
    pub checksums: Value,
    pub blob_created: String,
    pub created_by: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = asset_blobs)]
pub struct NewAssetBlob<'a> {
    pub blob_ref: &'a str,
    pub blob_size: i64,
    pub content_type: &'a str,
    pub checksums: Value,
    pub blob_created: &'a str,
    pub created_by: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Asset {
    pub id: i64,
    pub repository: String,
    pub path: String,
    pub component_id: Option<i64>,
    pub asset_blob_id: Option<i64>,
    pub kind: Option<String>,
    pub attributes: Value,
    pub created: String,
}

#[derive(Insertable)]
#[diesel(table_name = assets)]
pub struct NewAsset<'a> {
    pub repository: &'a str,
    pub path: &'a str,
    pub component_id: Option<i64>,
    pub asset_blob_id: Option<i64>,
    pub kind: Option<&'a str>,
    pub attributes: Value,
    pub created: &'a str,
}
