//! Rebuilding content metadata for a whole blob store.

use depot_core::{
    blob::{Blob, BlobId, FileBlobStore},
    database::connection::DieselDatabase,
    restore::{
        restore_blob, RestoreBlobData, RestoreOptions, RestoreOutcome, RestoreStrategyRegistry,
    },
    error::DepotError,
    DepotResult,
};
use depot_db::{models::content::Asset, repository::content::ContentRepository};
use depot_events::{next_op_id, DepotEvent, OperationId, RestoreStage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{DepotContext, FailedBlob, RestoreReport};

struct StoreRestorer<'a> {
    ctx: &'a DepotContext,
    store: FileBlobStore,
    content: &'a DieselDatabase,
    strategies: RestoreStrategyRegistry,
    options: RestoreOptions,
    op_id: OperationId,
}

impl StoreRestorer<'_> {
    fn emit(&self, blob_id: &BlobId, stage: RestoreStage) {
        self.ctx.events().emit(DepotEvent::Restoring {
            op_id: self.op_id,
            store: self.store.name().to_string(),
            blob_id: blob_id.to_string(),
            stage,
        });
    }

    fn skip(&self, report: &mut RestoreReport, blob_id: &BlobId, reason: String) {
        report.skipped += 1;
        self.emit(blob_id, RestoreStage::Skipped { reason });
    }

    /// A soft-deleted blob that an asset still points at was deleted by mistake.
    fn undelete_if_referenced(&self, data: &RestoreBlobData) -> DepotResult<bool> {
        let blob_ref = data.blob_ref();
        let referenced = self
            .content
            .with_conn(|conn| ContentRepository::blob_ref_in_use(conn, &blob_ref))?;
        if !referenced {
            return Ok(false);
        }
        if self.options.dry_run {
            debug!(blob_ref = %blob_ref, "dry run, referenced blob not undeleted");
            return Ok(true);
        }
        self.store.undelete(data.blob.id())
    }

    fn restore_one(&self, report: &mut RestoreReport, blob: Blob) -> DepotResult<()> {
        let id = blob.id().clone();
        let deleted = blob.is_deleted();

        let Some(data) = RestoreBlobData::from_blob(blob, self.store.name()) else {
            warn!(
                store = self.store.name(),
                blob_id = %id,
                "blob has no repository or path headers, skipping"
            );
            self.skip(report, &id, "missing headers".to_string());
            return Ok(());
        };

        if deleted {
            if self.options.undelete_referenced && self.undelete_if_referenced(&data)? {
                report.undeleted += 1;
                self.emit(&id, RestoreStage::Undeleted);
            } else {
                self.skip(report, &id, "soft-deleted".to_string());
            }
            return Ok(());
        }

        let Some(repository) = self.ctx.config().get_repository(&data.repository) else {
            warn!(
                repository = %data.repository,
                blob_id = %id,
                "repository is not configured, skipping"
            );
            self.skip(report, &id, format!("unknown repository '{}'", data.repository));
            return Ok(());
        };
        if !repository.is_restorable() {
            warn!(
                repository = %repository.name,
                blob_id = %id,
                "repository is not restorable, skipping"
            );
            self.skip(report, &id, format!("repository '{}' is not restorable", repository.name));
            return Ok(());
        }
        if repository.blob_store != self.store.name() {
            warn!(
                repository = %repository.name,
                expected = %repository.blob_store,
                blob_id = %id,
                "blob belongs to a repository of another store, skipping"
            );
            self.skip(report, &id, "repository uses another blob store".to_string());
            return Ok(());
        }
        let Some(strategy) = self.strategies.get(&repository.format) else {
            warn!(
                format = %repository.format,
                blob_id = %id,
                "no restore strategy for format, skipping"
            );
            self.skip(report, &id, format!("unsupported format '{}'", repository.format));
            return Ok(());
        };

        match restore_blob(strategy.as_ref(), &data, self.content, &self.options)? {
            RestoreOutcome::Restored {
                path, ..
            } => {
                report.restored += 1;
                self.emit(
                    &id,
                    RestoreStage::Restored {
                        repository: data.repository.clone(),
                        path,
                    },
                );
            }
            RestoreOutcome::WouldRestore {
                path,
            } => {
                report.would_restore += 1;
                self.emit(
                    &id,
                    RestoreStage::WouldRestore {
                        repository: data.repository.clone(),
                        path,
                    },
                );
            }
            RestoreOutcome::Skipped {
                reason,
            } => self.skip(report, &id, reason),
        }
        Ok(())
    }
}

/// Recreates missing assets and components for every blob of `store`.
///
/// Blobs that cannot be restored are skipped with a warning; blobs that fail are recorded in
/// the report and the walk continues. Running it twice gives the same content as running it
/// once.
pub fn restore_store(
    ctx: &DepotContext,
    store: &str,
    options: RestoreOptions,
    cancel: &CancellationToken,
) -> DepotResult<RestoreReport> {
    let restorer = StoreRestorer {
        ctx,
        store: ctx.open_store(store)?,
        content: ctx.content_db()?,
        strategies: ctx.restore_strategies(),
        options,
        op_id: next_op_id(),
    };
    info!(
        op_id = restorer.op_id,
        store,
        dry_run = options.dry_run,
        undelete_referenced = options.undelete_referenced,
        "restoring content metadata from blobs"
    );

    let mut report = RestoreReport::default();
    let mut processed = 0;

    for id in restorer.store.blob_ids()? {
        if cancel.is_cancelled() {
            report.cancelled = true;
            ctx.events().emit(DepotEvent::OperationCancelled {
                op_id: restorer.op_id,
                store: store.to_string(),
            });
            warn!(store, processed, "restore cancelled");
            break;
        }

        let id = id?;
        let result = restorer
            .store
            .get_including_deleted(&id)
            .and_then(|blob| {
                match blob {
                    Some(blob) => restorer.restore_one(&mut report, blob),
                    // removed since the walk listed it
                    None => Ok(()),
                }
            });

        if let Err(err) = result {
            warn!(store, blob_id = %id, error = %err, "failed to restore blob");
            restorer.emit(
                &id,
                RestoreStage::Failed {
                    error: err.to_string(),
                },
            );
            report.failed.push(FailedBlob {
                blob_id: id.to_string(),
                error: err.to_string(),
            });
        }

        processed += 1;
        ctx.events().emit(DepotEvent::BatchProgress {
            completed: processed,
            total: None,
            failed: report.failed.len() as u64,
        });
    }

    info!(
        store,
        restored = report.restored,
        would_restore = report.would_restore,
        skipped = report.skipped,
        undeleted = report.undeleted,
        failed = report.failed.len(),
        "restore finished"
    );
    Ok(report)
}

/// Lists assets in the content database, optionally for one configured repository.
pub fn list_assets(
    ctx: &DepotContext,
    repository: Option<&str>,
    limit: Option<i64>,
) -> DepotResult<Vec<Asset>> {
    if let Some(name) = repository {
        if ctx.config().get_repository(name).is_none() {
            return Err(DepotError::UnknownRepository(name.to_string()));
        }
    }
    ctx.content_db()?
        .with_conn(|conn| ContentRepository::list_assets(conn, repository, limit))
}
