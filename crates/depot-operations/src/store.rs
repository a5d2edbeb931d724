use std::{collections::HashMap, fs};

use depot_core::{error::ErrorContext, DepotResult};
use depot_db::models::metrics::BlobStoreMetrics;
use depot_events::{next_op_id, DepotEvent, LogLevel};
use depot_utils::fs::ensure_dir_exists;
use tracing::{debug, info};

use crate::{DepotContext, MetricsReset, RemoveStoreReport, StoreInfo};

/// Lists every configured store with its metrics and pending compaction count.
pub fn list_stores(ctx: &DepotContext) -> DepotResult<Vec<StoreInfo>> {
    let mut metrics: HashMap<String, BlobStoreMetrics> = ctx
        .metrics_store()?
        .list()?
        .into_iter()
        .map(|row| (row.blob_store_name.clone(), row))
        .collect();
    let ledger = ctx.ledger()?;

    let mut stores = Vec::with_capacity(ctx.config().blob_stores.len());
    for store in &ctx.config().blob_stores {
        let path = ctx.open_store(&store.name)?.root().to_path_buf();
        stores.push(StoreInfo {
            name: store.name.clone(),
            path,
            metrics: metrics.remove(&store.name),
            pending_compaction: ledger.count(&store.name)?,
            repositories: repository_names(ctx, &store.name),
        });
    }
    Ok(stores)
}

fn repository_names(ctx: &DepotContext, store: &str) -> Vec<String> {
    ctx.config()
        .repositories_in_store(store)
        .map(|repo| repo.name.clone())
        .collect()
}

/// Creates the store directory and its metrics row. Safe to run again on an existing store.
pub fn create_store(ctx: &DepotContext, name: &str) -> DepotResult<StoreInfo> {
    let store = ctx.open_store(name)?;
    ensure_dir_exists(store.root())?;
    store.metrics().initialize_metrics(name)?;
    info!(store = name, path = %store.root().display(), "blob store ready");

    Ok(StoreInfo {
        name: name.to_string(),
        path: store.root().to_path_buf(),
        metrics: store.metrics().get(name)?,
        pending_compaction: store.ledger().count(name)?,
        repositories: repository_names(ctx, name),
    })
}

/// Drops everything a store owns: ledger records, metrics and the directory on disk.
pub fn remove_store(ctx: &DepotContext, name: &str) -> DepotResult<RemoveStoreReport> {
    let store = ctx.open_store(name)?;

    let ledger_records = store.ledger().delete_all_records(name)?;
    let metrics_removed = store.metrics().remove(name)?;

    let directory_removed = store.root().exists();
    if directory_removed {
        fs::remove_dir_all(store.root())
            .with_context(|| format!("removing blob store directory {}", store.root().display()))?;
    }

    info!(store = name, ledger_records, "removed blob store");
    ctx.events().emit(DepotEvent::Log {
        level: LogLevel::Info,
        message: format!("removed blob store '{name}'"),
    });

    Ok(RemoveStoreReport {
        ledger_records,
        metrics_removed,
        directory_removed,
    })
}

pub fn reset_metrics(ctx: &DepotContext, name: &str, reset: MetricsReset) -> DepotResult<()> {
    let store = ctx.open_store(name)?;
    let metrics = store.metrics();

    if matches!(reset, MetricsReset::Operations | MetricsReset::All) {
        metrics.clear_operation_metrics(name)?;
    }
    if matches!(reset, MetricsReset::Counts | MetricsReset::All) {
        metrics.clear_count_metrics(name)?;
    }
    debug!(store = name, ?reset, "reset metrics");
    Ok(())
}

/// Re-creates ledger records for soft-deleted blobs that lost theirs.
pub fn rebuild_deleted_index(ctx: &DepotContext, name: &str) -> DepotResult<u64> {
    let op_id = next_op_id();
    let store = ctx.open_store(name)?;
    let added = store.rebuild_deleted_index()?;

    debug!(op_id, store = name, added, "rebuilt deleted index");
    ctx.events().emit(DepotEvent::Log {
        level: LogLevel::Info,
        message: format!("added {added} ledger records to store '{name}'"),
    });
    Ok(added)
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, io::Cursor};

    use depot_core::blob::headers;

    use super::*;
    use crate::context::test_support::test_context;

    #[test]
    fn test_create_store_is_repeatable() {
        let (_dir, ctx, _) = test_context();

        let first = create_store(&ctx, "default").unwrap();
        assert!(first.path.is_dir());
        assert_eq!(first.metrics.unwrap().blob_count, 0);
        assert!(first.repositories.contains(&"raw-hosted".to_string()));

        create_store(&ctx, "default").unwrap();
        assert_eq!(list_stores(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_store_drops_everything() {
        let (_dir, ctx, events) = test_context();
        let info = create_store(&ctx, "default").unwrap();

        let store = ctx.open_store("default").unwrap();
        let headers = BTreeMap::from([(headers::BLOB_NAME.to_string(), "a".to_string())]);
        let blob = store.create(&mut Cursor::new(b"abc"), headers).unwrap();
        store.delete(blob.id(), "test").unwrap();

        let report = remove_store(&ctx, "default").unwrap();
        assert_eq!(report.ledger_records, 1);
        assert!(report.metrics_removed);
        assert!(report.directory_removed);
        assert!(!info.path.exists());
        assert!(ctx.metrics_store().unwrap().get("default").unwrap().is_none());
        assert!(!events.is_empty());

        let again = remove_store(&ctx, "default").unwrap();
        assert_eq!(again.ledger_records, 0);
        assert!(!again.metrics_removed);
        assert!(!again.directory_removed);
    }

    #[test]
    fn test_reset_metrics_selects_fields() {
        let (_dir, ctx, _) = test_context();
        create_store(&ctx, "default").unwrap();
        let store = ctx.open_store("default").unwrap();
        let headers = BTreeMap::from([(headers::BLOB_NAME.to_string(), "a".to_string())]);
        store.create(&mut Cursor::new(b"abc"), headers).unwrap();

        reset_metrics(&ctx, "default", MetricsReset::Operations).unwrap();
        let row = store.metrics().get("default").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size, row.upload_count), (1, 3, 0));

        reset_metrics(&ctx, "default", MetricsReset::Counts).unwrap();
        let row = store.metrics().get("default").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size), (0, 0));
    }

    #[test]
    fn test_rebuild_deleted_index() {
        let (_dir, ctx, _) = test_context();
        let store = ctx.open_store("default").unwrap();
        let headers = BTreeMap::from([(headers::BLOB_NAME.to_string(), "a".to_string())]);
        let blob = store.create(&mut Cursor::new(b"abc"), headers).unwrap();
        store.delete(blob.id(), "test").unwrap();
        store.ledger().delete_all_records("default").unwrap();

        assert_eq!(rebuild_deleted_index(&ctx, "default").unwrap(), 1);
        assert_eq!(rebuild_deleted_index(&ctx, "default").unwrap(), 0);
    }
}
