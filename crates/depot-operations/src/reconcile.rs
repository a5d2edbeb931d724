use depot_core::DepotResult;
use depot_events::{next_op_id, DepotEvent, LogLevel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{DepotContext, FailedBlob, ReconcileReport, VerifyReport};

/// Recomputes blob count and total size of `store` from the live blobs on disk.
///
/// Operation counters are left alone. A cancelled run does not touch the stored metrics.
pub fn reconcile_metrics(
    ctx: &DepotContext,
    store: &str,
    cancel: &CancellationToken,
) -> DepotResult<ReconcileReport> {
    let op_id = next_op_id();
    let blob_store = ctx.open_store(store)?;
    let mut report = ReconcileReport::default();

    if let Some(current) = blob_store.metrics().get(store)? {
        report.previous_count = current.blob_count;
        report.previous_size = current.total_size;
    }

    for id in blob_store.blob_ids()? {
        if cancel.is_cancelled() {
            report.cancelled = true;
            ctx.events().emit(DepotEvent::OperationCancelled {
                op_id,
                store: store.to_string(),
            });
            warn!(store, "metrics reconciliation cancelled");
            return Ok(report);
        }

        let id = id?;
        match blob_store.get_including_deleted(&id) {
            Ok(Some(blob)) if blob.is_deleted() => report.soft_deleted += 1,
            Ok(Some(blob)) => {
                report.blob_count += 1;
                report.total_size += blob.size();
            }
            Ok(None) => {}
            Err(err) => warn!(store, blob_id = %id, error = %err, "skipping unreadable blob"),
        }
    }

    blob_store.metrics().set_count_metrics(
        store,
        report.blob_count as i64,
        report.total_size as i64,
    )?;

    info!(
        op_id,
        store,
        blob_count = report.blob_count,
        total_size = report.total_size,
        previous_count = report.previous_count,
        previous_size = report.previous_size,
        "reconciled blob store metrics"
    );
    ctx.events().emit(DepotEvent::MetricsReconciled {
        op_id,
        store: store.to_string(),
        blob_count: report.blob_count,
        total_size: report.total_size,
    });
    Ok(report)
}

/// Re-hashes every live blob of `store` and reports those whose content changed on disk.
pub fn verify_store(
    ctx: &DepotContext,
    store: &str,
    cancel: &CancellationToken,
) -> DepotResult<VerifyReport> {
    let op_id = next_op_id();
    let blob_store = ctx.open_store(store)?;
    let mut report = VerifyReport::default();

    for id in blob_store.blob_ids()? {
        if cancel.is_cancelled() {
            report.cancelled = true;
            ctx.events().emit(DepotEvent::OperationCancelled {
                op_id,
                store: store.to_string(),
            });
            warn!(store, "verification cancelled");
            return Ok(report);
        }

        let id = id?;
        let verified = blob_store
            .get(&id)
            .and_then(|blob| blob.map(|blob| blob.verify_content()).transpose());
        match verified {
            Ok(Some(true)) => report.checked += 1,
            Ok(Some(false)) => {
                report.checked += 1;
                warn!(store, blob_id = %id, "blob content does not match its digest");
                ctx.events().emit(DepotEvent::Log {
                    level: LogLevel::Warning,
                    message: format!("{store}@{id} is corrupt"),
                });
                report.corrupt.push(id.to_string());
            }
            Ok(None) => {}
            Err(err) => {
                report.failed.push(FailedBlob {
                    blob_id: id.to_string(),
                    error: err.to_string(),
                })
            }
        }
    }

    info!(
        op_id,
        store,
        checked = report.checked,
        corrupt = report.corrupt.len(),
        "verified blob store"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, io::Cursor};

    use depot_core::blob::headers;

    use super::*;
    use crate::context::test_support::test_context;

    #[test]
    fn test_reconcile_fixes_drifted_counts() {
        let (_dir, ctx, _) = test_context();
        let store = ctx.open_store("default").unwrap();
        let headers = BTreeMap::from([(headers::BLOB_NAME.to_string(), "a".to_string())]);
        store.create(&mut Cursor::new(b"12345"), headers.clone()).unwrap();
        let deleted = store.create(&mut Cursor::new(b"123"), headers).unwrap();
        store.delete(deleted.id(), "test").unwrap();

        store.metrics().set_count_metrics("default", 42, 4200).unwrap();

        let report = reconcile_metrics(&ctx, "default", &CancellationToken::new()).unwrap();
        assert_eq!((report.previous_count, report.previous_size), (42, 4200));
        assert_eq!((report.blob_count, report.total_size), (1, 5));
        assert_eq!(report.soft_deleted, 1);

        let row = store.metrics().get("default").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size), (1, 5));
        assert_eq!(row.upload_count, 2);
    }

    #[test]
    fn test_cancelled_reconcile_keeps_metrics() {
        let (_dir, ctx, _) = test_context();
        let store = ctx.open_store("default").unwrap();
        let headers = BTreeMap::from([(headers::BLOB_NAME.to_string(), "a".to_string())]);
        store.create(&mut Cursor::new(b"12345"), headers).unwrap();
        store.metrics().set_count_metrics("default", 7, 7).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = reconcile_metrics(&ctx, "default", &cancel).unwrap();
        assert!(report.cancelled);

        let row = store.metrics().get("default").unwrap().unwrap();
        assert_eq!((row.blob_count, row.total_size), (7, 7));
    }

    #[test]
    fn test_verify_store_reports_corrupt_and_missing_content() {
        let (_dir, ctx, _) = test_context();
        let store = ctx.open_store("default").unwrap();
        let headers = BTreeMap::from([(headers::BLOB_NAME.to_string(), "a".to_string())]);
        store.create(&mut Cursor::new(b"intact"), headers.clone()).unwrap();
        let corrupt = store.create(&mut Cursor::new(b"original"), headers.clone()).unwrap();
        let missing = store.create(&mut Cursor::new(b"gone"), headers.clone()).unwrap();
        let deleted = store.create(&mut Cursor::new(b"deleted"), headers).unwrap();
        store.delete(deleted.id(), "test").unwrap();

        std::fs::write(corrupt.content_path(), b"tampered").unwrap();
        std::fs::remove_file(missing.content_path()).unwrap();

        let report = verify_store(&ctx, "default", &CancellationToken::new()).unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.corrupt, vec![corrupt.id().to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].blob_id, missing.id().to_string());
        assert!(!report.cancelled);
    }
}
