use std::path::PathBuf;

use depot_db::models::metrics::BlobStoreMetrics;
use serde::Serialize;

// ---- Stores ----

/// A configured blob store with its current accounting.
#[derive(Debug, Serialize)]
pub struct StoreInfo {
    pub name: String,
    pub path: PathBuf,
    pub metrics: Option<BlobStoreMetrics>,
    /// Soft-deleted blobs waiting for compaction.
    pub pending_compaction: u64,
    pub repositories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveStoreReport {
    pub ledger_records: usize,
    pub metrics_removed: bool,
    pub directory_removed: bool,
}

/// Which metrics [`reset_metrics`](crate::store::reset_metrics) clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsReset {
    Operations,
    Counts,
    All,
}

// ---- Compaction ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompactionMode {
    /// Walk every ledger record of the store.
    #[default]
    All,
    /// Only the oldest records, for small incremental runs.
    Oldest,
}

#[derive(Debug, Default, Serialize)]
pub struct CompactReport {
    pub removed: u64,
    pub freed: u64,
    /// Records dropped because their blob was live again or already gone.
    pub stale: u64,
    /// Blobs soft-deleted too recently to remove.
    pub retained: u64,
    pub failed: Vec<FailedBlob>,
    pub cancelled: bool,
}

// ---- Restore ----

#[derive(Debug, Default, Serialize)]
pub struct RestoreReport {
    pub restored: u64,
    /// Assets a dry run would have created.
    pub would_restore: u64,
    pub skipped: u64,
    pub undeleted: u64,
    pub failed: Vec<FailedBlob>,
    pub cancelled: bool,
}

// ---- Reconcile ----

#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub blob_count: u64,
    pub total_size: u64,
    pub soft_deleted: u64,
    /// Count and size stored before reconciling.
    pub previous_count: i64,
    pub previous_size: i64,
    pub cancelled: bool,
}

// ---- Verify ----

#[derive(Debug, Default, Serialize)]
pub struct VerifyReport {
    pub checked: u64,
    /// Live blobs whose content no longer matches the recorded digest.
    pub corrupt: Vec<String>,
    /// Blobs that could not be read at all.
    pub failed: Vec<FailedBlob>,
    pub cancelled: bool,
}

/// A blob an operation could not process.
#[derive(Debug, Serialize)]
pub struct FailedBlob {
    pub blob_id: String,
    pub error: String,
}
