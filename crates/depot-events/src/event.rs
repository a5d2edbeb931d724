use crate::OperationId;

/// All event types emitted by depot operations.
#[derive(Debug, Clone)]
pub enum DepotEvent {
    /// A blob was written and is live.
    BlobCreated {
        store: String,
        blob_id: String,
        size: u64,
    },
    /// A live blob was soft-deleted and queued for compaction.
    BlobSoftDeleted {
        store: String,
        blob_id: String,
        reason: String,
    },
    /// A soft-deleted blob was made live again.
    BlobUndeleted { store: String, blob_id: String },
    /// Compaction stage for a store.
    Compacting {
        op_id: OperationId,
        store: String,
        stage: CompactStage,
    },
    /// Restore outcome for a single blob.
    Restoring {
        op_id: OperationId,
        store: String,
        blob_id: String,
        stage: RestoreStage,
    },
    /// Metrics of a store were recomputed from disk.
    MetricsReconciled {
        op_id: OperationId,
        store: String,
        blob_count: u64,
        total_size: u64,
    },
    /// A long-running operation stopped early on request.
    OperationCancelled { op_id: OperationId, store: String },
    /// Overall progress of a batch.
    BatchProgress {
        completed: u64,
        total: Option<u64>,
        failed: u64,
    },
    /// Free-form message.
    Log { level: LogLevel, message: String },
}

#[derive(Debug, Clone)]
pub enum CompactStage {
    Starting,
    /// A soft-deleted blob was hard-deleted.
    Removed { blob_id: String, size: u64 },
    /// The ledger held a record for a blob that is live again or already gone.
    StaleRecord { blob_id: String },
    /// The blob was soft-deleted too recently to be removed.
    Retained { blob_id: String },
    Complete { removed: u64, freed: u64 },
}

#[derive(Debug, Clone)]
pub enum RestoreStage {
    Restored { repository: String, path: String },
    /// Dry run: the asset would have been created.
    WouldRestore { repository: String, path: String },
    Skipped { reason: String },
    /// A soft-deleted blob still referenced by an asset was made live again.
    Undeleted,
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
