//! Hard-deleting soft-deleted blobs.

use chrono::{DateTime, Utc};
use depot_core::{
    blob::{BlobId, FileBlobStore, Purged},
    error::DepotError,
    DepotResult,
};
use depot_events::{next_op_id, CompactStage, DepotEvent, OperationId};
use depot_utils::lock::FileLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{CompactReport, CompactionMode, DepotContext, FailedBlob};

enum Compacted {
    Removed(u64),
    Stale,
    Retained,
}

struct Compactor<'a> {
    ctx: &'a DepotContext,
    store: FileBlobStore,
    op_id: OperationId,
    min_age_ms: u128,
    now: DateTime<Utc>,
}

impl Compactor<'_> {
    fn emit(&self, stage: CompactStage) {
        self.ctx.events().emit(DepotEvent::Compacting {
            op_id: self.op_id,
            store: self.store.name().to_string(),
            stage,
        });
    }

    fn old_enough(&self, id: &BlobId, deleted_at: Option<&str>) -> bool {
        if self.min_age_ms == 0 {
            return true;
        }
        let Some(deleted_at) = deleted_at else {
            return true;
        };
        match DateTime::parse_from_rfc3339(deleted_at) {
            Ok(deleted_at) => {
                let age = self.now.signed_duration_since(deleted_at);
                age.num_milliseconds().max(0) as u128 >= self.min_age_ms
            }
            Err(err) => {
                warn!(blob_id = %id, deleted_at, error = %err, "unparseable deletion time, compacting anyway");
                true
            }
        }
    }

    fn compact_blob(&self, id: &BlobId) -> DepotResult<Compacted> {
        let name = self.store.name();
        let purged = self.store.purge_deleted(id, |blob| {
            !self.old_enough(id, blob.attributes().deleted_date_time.as_deref())
        })?;

        Ok(match purged {
            Purged::Removed(size) => Compacted::Removed(size),
            Purged::Retained => Compacted::Retained,
            Purged::Live => {
                debug!(store = name, blob_id = %id, "blob is live again, dropped ledger record");
                Compacted::Stale
            }
            Purged::Missing => {
                debug!(store = name, blob_id = %id, "blob already gone, dropped ledger record");
                Compacted::Stale
            }
        })
    }
}

/// Hard-deletes the soft-deleted blobs of `store` that the ledger lists.
///
/// Only one compaction per store runs at a time; a second caller gets
/// [`DepotError::StoreBusy`]. Cancellation is checked between blobs and leaves every blob
/// processed so far removed.
pub fn compact_store(
    ctx: &DepotContext,
    store: &str,
    mode: CompactionMode,
    cancel: &CancellationToken,
) -> DepotResult<CompactReport> {
    let blob_store = ctx.open_store(store)?;
    let lock_dir = ctx.config().get_lock_path()?;
    let Some(_lock) = FileLock::try_acquire(&lock_dir, &format!("compact-{store}"))? else {
        return Err(DepotError::StoreBusy(store.to_string()));
    };

    let compactor = Compactor {
        ctx,
        op_id: next_op_id(),
        min_age_ms: ctx.config().get_compaction_min_age(),
        now: Utc::now(),
        store: blob_store,
    };
    info!(op_id = compactor.op_id, store, ?mode, "compacting blob store");
    compactor.emit(CompactStage::Starting);

    let ids: Box<dyn Iterator<Item = DepotResult<BlobId>>> = match mode {
        CompactionMode::All => compactor.store.ledger().read_all_blob_ids(store),
        CompactionMode::Oldest => {
            Box::new(
                compactor
                    .store
                    .ledger()
                    .read_oldest_records(store)?
                    .into_iter()
                    .map(Ok),
            )
        }
    };

    let mut report = CompactReport::default();
    for id in ids {
        if cancel.is_cancelled() {
            report.cancelled = true;
            ctx.events().emit(DepotEvent::OperationCancelled {
                op_id: compactor.op_id,
                store: store.to_string(),
            });
            warn!(store, "compaction cancelled");
            break;
        }

        let id = id?;
        match compactor.compact_blob(&id) {
            Ok(Compacted::Removed(size)) => {
                report.removed += 1;
                report.freed += size;
                compactor.emit(CompactStage::Removed {
                    blob_id: id.to_string(),
                    size,
                });
            }
            Ok(Compacted::Stale) => {
                report.stale += 1;
                compactor.emit(CompactStage::StaleRecord {
                    blob_id: id.to_string(),
                });
            }
            Ok(Compacted::Retained) => {
                report.retained += 1;
                compactor.emit(CompactStage::Retained {
                    blob_id: id.to_string(),
                });
            }
            Err(err) => {
                warn!(store, blob_id = %id, error = %err, "failed to compact blob");
                report.failed.push(FailedBlob {
                    blob_id: id.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    compactor.emit(CompactStage::Complete {
        removed: report.removed,
        freed: report.freed,
    });
    info!(
        store,
        removed = report.removed,
        freed = report.freed,
        stale = report.stale,
        retained = report.retained,
        failed = report.failed.len(),
        "compaction finished"
    );
    Ok(report)
}
