//! Content metadata queries: components, asset blobs and assets.

use diesel::{dsl::exists, prelude::*};

use crate::{
    models::content::{Asset, AssetBlob, Component, NewAsset, NewAssetBlob, NewComponent},
    schema::content::{asset_blobs, assets, components},
};

/// Repository for the content database.
pub struct ContentRepository;

impl ContentRepository {
    pub fn find_component(
        conn: &mut SqliteConnection,
        repository: &str,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> QueryResult<Option<Component>> {
        components::table
            .filter(components::repository.eq(repository))
            .filter(components::namespace.eq(namespace))
            .filter(components::name.eq(name))
            .filter(components::version.eq(version))
            .select(Component::as_select())
            .first(conn)
            .optional()
    }

    pub fn insert_component(
        conn: &mut SqliteConnection,
        component: &NewComponent,
    ) -> QueryResult<Component> {
        diesel::insert_into(components::table)
            .values(component)
            .returning(Component::as_returning())
            .get_result(conn)
    }

    pub fn count_components(conn: &mut SqliteConnection, repository: &str) -> QueryResult<i64> {
        components::table
            .filter(components::repository.eq(repository))
            .count()
            .get_result(conn)
    }

    pub fn asset_exists(
        conn: &mut SqliteConnection,
        repository: &str,
        path: &str,
    ) -> QueryResult<bool> {
        diesel::select(exists(
            assets::table
                .filter(assets::repository.eq(repository))
                .filter(assets::path.eq(path)),
        ))
        .get_result(conn)
    }

    pub fn insert_asset(conn: &mut SqliteConnection, asset: &NewAsset) -> QueryResult<Asset> {
        diesel::insert_into(assets::table)
            .values(asset)
            .returning(Asset::as_returning())
            .get_result(conn)
    }

    /// Lists assets of a repository ordered by path.
    pub fn list_assets(
        conn: &mut SqliteConnection,
        repository: Option<&str>,
        limit: Option<i64>,
    ) -> QueryResult<Vec<Asset>> {
        let mut query = assets::table.into_boxed();

        if let Some(repository) = repository {
            query = query.filter(assets::repository.eq(repository));
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .order((assets::repository.asc(), assets::path.asc()))
            .select(Asset::as_select())
            .load(conn)
    }

    pub fn count_assets(conn: &mut SqliteConnection, repository: &str) -> QueryResult<i64> {
        assets::table
            .filter(assets::repository.eq(repository))
            .count()
            .get_result(conn)
    }

    pub fn insert_asset_blob(
        conn: &mut SqliteConnection,
        asset_blob: &NewAssetBlob,
    ) -> QueryResult<AssetBlob> {
        diesel::insert_into(asset_blobs::table)
            .values(asset_blob)
            .returning(AssetBlob::as_returning())
            .get_result(conn)
    }

    pub fn find_asset_blob(
        conn: &mut SqliteConnection,
        blob_ref: &str,
    ) -> QueryResult<Option<AssetBlob>> {
        asset_blobs::table
            .filter(asset_blobs::blob_ref.eq(blob_ref))
            .select(AssetBlob::as_select())
            .first(conn)
            .optional()
    }

    /// True when some asset points at the asset blob with `blob_ref`.
    pub fn blob_ref_in_use(conn: &mut SqliteConnection, blob_ref: &str) -> QueryResult<bool> {
        diesel::select(exists(
            assets::table
                .inner_join(asset_blobs::table)
                .filter(asset_blobs::blob_ref.eq(blob_ref)),
        ))
        .get_result(conn)
    }
}
