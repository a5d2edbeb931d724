//! Rebuilding content metadata from blobs.
//!
//! Each blob carries enough headers (repository, asset path, content type) to recreate its
//! asset, and for most formats the content itself names the component. A
//! [`RestoreBlobStrategy`] per repository format knows how to read that; [`restore_blob`]
//! drives one blob through it.

pub mod apt;
pub mod archive;
pub mod maven;
pub mod npm;
pub mod raw;
pub mod registry;

use depot_db::{
    models::content::{Asset, AssetBlob, Component, NewAsset, NewAssetBlob, NewComponent},
    repository::content::ContentRepository,
};
use diesel::SqliteConnection;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    blob::{headers, Blob},
    database::connection::DieselDatabase,
    timestamp, DepotResult,
};

pub use registry::RestoreStrategyRegistry;

/// Everything a strategy may look at for one blob.
#[derive(Debug, Clone)]
pub struct RestoreBlobData {
    pub blob: Blob,
    pub blob_store: String,
    pub repository: String,
    /// Asset path from the blob headers, without a leading `/`.
    pub blob_name: String,
}

impl RestoreBlobData {
    /// Builds restore data from the blob headers. `None` when the blob does not name its
    /// repository or asset path.
    pub fn from_blob(blob: Blob, blob_store: &str) -> Option<Self> {
        let repository = blob.header(headers::REPO_NAME)?.to_string();
        let blob_name = blob
            .header(headers::BLOB_NAME)?
            .trim_start_matches('/')
            .to_string();
        Some(Self {
            blob,
            blob_store: blob_store.to_string(),
            repository,
            blob_name,
        })
    }

    /// `<store>@<blob id>`, the key tying an asset blob row to the blob on disk.
    pub fn blob_ref(&self) -> String {
        format!("{}@{}", self.blob_store, self.blob.id())
    }

    pub fn content_type(&self) -> &str {
        self.blob
            .header(headers::CONTENT_TYPE)
            .unwrap_or("application/octet-stream")
    }
}

/// Coordinates that identify a component within a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentQuery {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Decide what would be restored without writing anything.
    pub dry_run: bool,
    /// Make soft-deleted blobs live again when an existing asset still references them.
    pub undelete_referenced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored {
        path: String,
        component_id: Option<i64>,
    },
    WouldRestore {
        path: String,
    },
    Skipped {
        reason: String,
    },
}

/// Format-specific knowledge needed to recreate an asset from its blob.
pub trait RestoreBlobStrategy: Send + Sync {
    /// Repository format this strategy handles, e.g. `"maven2"`.
    fn format(&self) -> &'static str;

    /// Whether the blob looks like something this format can restore at all.
    fn can_attempt_restore(&self, data: &RestoreBlobData) -> bool {
        !data.blob_name.is_empty()
    }

    fn asset_path(&self, data: &RestoreBlobData) -> String {
        data.blob_name.clone()
    }

    fn asset_exists(&self, conn: &mut SqliteConnection, data: &RestoreBlobData) -> DepotResult<bool> {
        Ok(ContentRepository::asset_exists(
            conn,
            &data.repository,
            &self.asset_path(data),
        )?)
    }

    /// Whether an asset at `path` belongs to a component.
    fn component_required(&self, path: &str) -> bool;

    /// Format attributes of the asset; may read the blob content.
    fn extract_attributes(&self, data: &RestoreBlobData) -> DepotResult<Value>;

    /// Component coordinates derived from the path and extracted attributes.
    fn component_query(&self, path: &str, attributes: &Value) -> Option<ComponentQuery>;

    fn asset_kind(&self, _path: &str) -> Option<&'static str> {
        None
    }

    fn create_asset_from_blob(
        &self,
        conn: &mut SqliteConnection,
        asset_blob: &AssetBlob,
        component: Option<&Component>,
        data: &RestoreBlobData,
        attributes: &Value,
    ) -> DepotResult<Asset> {
        let path = self.asset_path(data);
        let created = timestamp();
        let asset = NewAsset {
            repository: &data.repository,
            path: &path,
            component_id: component.map(|c| c.id),
            asset_blob_id: Some(asset_blob.id),
            kind: self.asset_kind(&path),
            attributes: json!({ self.format(): attributes }),
            created: &created,
        };
        Ok(ContentRepository::insert_asset(conn, &asset)?)
    }
}

fn find_or_create_component(
    conn: &mut SqliteConnection,
    repository: &str,
    format: &str,
    query: &ComponentQuery,
    attributes: &Value,
) -> DepotResult<Component> {
    if let Some(existing) = ContentRepository::find_component(
        conn,
        repository,
        &query.namespace,
        &query.name,
        &query.version,
    )? {
        return Ok(existing);
    }

    let created = timestamp();
    let component = NewComponent {
        repository,
        namespace: &query.namespace,
        name: &query.name,
        version: &query.version,
        kind: query.kind.as_deref(),
        attributes: json!({ format: attributes }),
        created: &created,
    };
    Ok(ContentRepository::insert_component(conn, &component)?)
}

fn find_or_create_asset_blob(
    conn: &mut SqliteConnection,
    data: &RestoreBlobData,
) -> DepotResult<AssetBlob> {
    let blob_ref = data.blob_ref();
    if let Some(existing) = ContentRepository::find_asset_blob(conn, &blob_ref)? {
        return Ok(existing);
    }

    let metrics = &data.blob.attributes().metrics;
    let asset_blob = NewAssetBlob {
        blob_ref: &blob_ref,
        blob_size: metrics.content_size as i64,
        content_type: data.content_type(),
        checksums: json!({ "sha256": metrics.sha256, "blake3": metrics.blake3 }),
        blob_created: &metrics.created,
        created_by: data.blob.header(headers::CREATED_BY),
    };
    Ok(ContentRepository::insert_asset_blob(conn, &asset_blob)?)
}

/// Restores the asset (and component) of one blob.
///
/// Restoring a blob whose asset already exists is a no-op, so running a restore twice is
/// the same as running it once.
pub fn restore_blob(
    strategy: &dyn RestoreBlobStrategy,
    data: &RestoreBlobData,
    content: &DieselDatabase,
    options: &RestoreOptions,
) -> DepotResult<RestoreOutcome> {
    let blob_id = data.blob.id();

    if !strategy.can_attempt_restore(data) {
        warn!(
            repository = %data.repository,
            blob_id = %blob_id,
            path = %data.blob_name,
            format = strategy.format(),
            "blob cannot be restored by this format, skipping"
        );
        return Ok(RestoreOutcome::Skipped {
            reason: format!("not restorable as {}", strategy.format()),
        });
    }

    let path = strategy.asset_path(data);
    if content.with_conn(|conn| strategy.asset_exists(conn, data))? {
        debug!(repository = %data.repository, path = %path, "asset already exists");
        return Ok(RestoreOutcome::Skipped {
            reason: "asset exists".to_string(),
        });
    }

    let attributes = strategy.extract_attributes(data)?;
    let component_query = if strategy.component_required(&path) {
        match strategy.component_query(&path, &attributes) {
            Some(query) => Some(query),
            None => {
                warn!(
                    repository = %data.repository,
                    path = %path,
                    "no component coordinates for component asset, skipping"
                );
                return Ok(RestoreOutcome::Skipped {
                    reason: "no component coordinates".to_string(),
                });
            }
        }
    } else {
        None
    };

    if options.dry_run {
        debug!(repository = %data.repository, path = %path, "dry run, asset not written");
        return Ok(RestoreOutcome::WouldRestore {
            path,
        });
    }

    let asset = content.transaction(|conn| {
        let component = match &component_query {
            Some(query) => {
                Some(find_or_create_component(
                    conn,
                    &data.repository,
                    strategy.format(),
                    query,
                    &attributes,
                )?)
            }
            None => None,
        };
        let asset_blob = find_or_create_asset_blob(conn, data)?;
        strategy.create_asset_from_blob(conn, &asset_blob, component.as_ref(), data, &attributes)
    })?;

    debug!(
        repository = %data.repository,
        path = %asset.path,
        component_id = ?asset.component_id,
        "restored asset"
    );
    Ok(RestoreOutcome::Restored {
        path: asset.path,
        component_id: asset.component_id,
    })
}


#[cfg(test)]
mod tests {
    use super::{raw::RawRestoreBlobStrategy, test_support::Fixture, *};

    #[test]
    fn test_restore_twice_equals_once() {
        let fixture = Fixture::new();
        let data = fixture.put("raw-hosted", "/docs/readme.txt", b"hi");
        let strategy = RawRestoreBlobStrategy;

        let first = restore_blob(&strategy, &data, &fixture.content, &RestoreOptions::default())
            .unwrap();
        assert_eq!(
            first,
            RestoreOutcome::Restored {
                path: "docs/readme.txt".into(),
                component_id: None,
            }
        );

        let second = restore_blob(&strategy, &data, &fixture.content, &RestoreOptions::default())
            .unwrap();
        assert!(matches!(second, RestoreOutcome::Skipped { .. }));

        let count = fixture
            .content
            .with_conn(|conn| ContentRepository::count_assets(conn, "raw-hosted"))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let fixture = Fixture::new();
        let data = fixture.put("raw-hosted", "a.bin", b"x");
        let options = RestoreOptions {
            dry_run: true,
            ..Default::default()
        };

        let outcome = restore_blob(&RawRestoreBlobStrategy, &data, &fixture.content, &options)
            .unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::WouldRestore {
                path: "a.bin".into()
            }
        );
        let count = fixture
            .content
            .with_conn(|conn| ContentRepository::count_assets(conn, "raw-hosted"))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_asset_blob_records_checksums() {
        let fixture = Fixture::new();
        let data = fixture.put("raw-hosted", "a.bin", b"hello world\n");
        restore_blob(&RawRestoreBlobStrategy, &data, &fixture.content, &RestoreOptions::default())
            .unwrap();

        let asset_blob = fixture
            .content
            .with_conn(|conn| ContentRepository::find_asset_blob(conn, &data.blob_ref()))
            .unwrap()
            .unwrap();
        assert_eq!(asset_blob.blob_size, 12);
        assert_eq!(
            asset_blob.checksums["sha256"],
            "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447"
        );
    }

    #[test]
    fn test_blob_without_repository_header_has_no_restore_data() {
        let fixture = Fixture::new();
        let headers = std::collections::BTreeMap::from([(
            headers::BLOB_NAME.to_string(),
            "a".to_string(),
        )]);
        let blob = fixture
            .store
            .create(&mut std::io::Cursor::new(b"a"), headers)
            .unwrap();
        assert!(RestoreBlobData::from_blob(blob, "default").is_none());
    }
}
