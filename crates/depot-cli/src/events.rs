use std::{sync::mpsc::Receiver, thread::JoinHandle};

use depot_events::{CompactStage, DepotEvent, LogLevel, RestoreStage};
use nu_ansi_term::Color::{Cyan, Green, Yellow};
use tracing::{debug, error, info, trace, warn};

use crate::utils::Colored;

/// Joins the event thread once every sender is gone.
pub struct EventGuard {
    handle: Option<JoinHandle<()>>,
}

impl Drop for EventGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn log_event(event: DepotEvent) {
    match event {
        DepotEvent::BlobCreated {
            store,
            blob_id,
            size,
        } => debug!("created {} in {store} ({size} bytes)", Colored(Cyan, blob_id)),
        DepotEvent::BlobSoftDeleted {
            store,
            blob_id,
            reason,
        } => debug!("soft-deleted {} in {store}: {reason}", Colored(Cyan, blob_id)),
        DepotEvent::BlobUndeleted {
            store,
            blob_id,
        } => debug!("undeleted {} in {store}", Colored(Cyan, blob_id)),
        DepotEvent::Compacting {
            op_id,
            store,
            stage,
        } => {
            match stage {
                CompactStage::Starting => debug!("[{op_id}] compacting {store}"),
                CompactStage::Removed {
                    blob_id,
                    size,
                } => debug!("[{op_id}] removed {} ({size} bytes)", Colored(Cyan, blob_id)),
                CompactStage::StaleRecord {
                    blob_id,
                } => debug!("[{op_id}] dropped stale record for {blob_id}"),
                CompactStage::Retained {
                    blob_id,
                } => trace!("[{op_id}] kept recently deleted {blob_id}"),
                CompactStage::Complete {
                    removed,
                    freed,
                } => debug!("[{op_id}] compaction of {store} removed {removed} blobs, {freed} bytes"),
            }
        }
        DepotEvent::Restoring {
            op_id,
            blob_id,
            stage,
            ..
        } => {
            match stage {
                RestoreStage::Restored {
                    repository,
                    path,
                } => debug!("[{op_id}] restored {}:{}", Colored(Green, repository), path),
                RestoreStage::WouldRestore {
                    repository,
                    path,
                } => info!("would restore {}:{}", Colored(Green, repository), path),
                RestoreStage::Skipped {
                    reason,
                } => trace!("[{op_id}] skipped {blob_id}: {reason}"),
                RestoreStage::Undeleted => info!("undeleted referenced blob {}", Colored(Cyan, blob_id)),
                RestoreStage::Failed {
                    error,
                } => debug!("[{op_id}] {blob_id} failed: {error}"),
            }
        }
        DepotEvent::MetricsReconciled {
            store,
            blob_count,
            total_size,
            ..
        } => debug!("{store}: {blob_count} blobs, {total_size} bytes on disk"),
        DepotEvent::OperationCancelled {
            store, ..
        } => warn!("{} operation on {store} cancelled", Colored(Yellow, "!")),
        DepotEvent::BatchProgress {
            completed,
            total,
            failed,
        } => {
            if completed % 1000 == 0 {
                match total {
                    Some(total) => debug!("{completed}/{total} processed, {failed} failed"),
                    None => debug!("{completed} processed, {failed} failed"),
                }
            }
        }
        DepotEvent::Log {
            level,
            message,
        } => {
            match level {
                LogLevel::Debug => debug!("{message}"),
                LogLevel::Info => info!("{message}"),
                LogLevel::Warning => warn!("{message}"),
                LogLevel::Error => error!("{message}"),
            }
        }
    }
}

/// Logs events from `receiver` on a background thread until the channel closes.
pub fn spawn_event_handler(receiver: Receiver<DepotEvent>) -> EventGuard {
    let handle = std::thread::spawn(move || {
        while let Ok(event) = receiver.recv() {
            log_event(event);
        }
    });
    EventGuard {
        handle: Some(handle),
    }
}
