//! File-backed blob storage.
//!
//! A blob is a content file plus a JSON attributes file next to it. Blobs move through
//! `LIVE -> SOFT_DELETED -> HARD_DELETED`; soft-deleted blobs stay on disk, are hidden from
//! [`FileBlobStore::get`](file::FileBlobStore::get) and are queued in the soft-deleted ledger
//! until compaction removes them.

pub mod attributes;
pub mod file;
pub mod id;

pub use attributes::{headers, BlobAttributes, BlobMetrics};
pub use file::{Blob, FileBlobStore, Purged};
pub use id::BlobId;
