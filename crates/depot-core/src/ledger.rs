//! Soft-deleted blob ledger.
//!
//! Every soft delete appends a record; compaction consumes records by hard-deleting the blob
//! and removing the record. Reads use keyset pagination on the never-reused record id, so a
//! scan stays correct while other writers append or consume records.

use std::collections::VecDeque;

use depot_db::{
    models::ledger::{NewSoftDeletedBlob, SoftDeletedBlob},
    repository::ledger::SoftDeletedBlobRepository,
};
use tracing::{debug, warn};

use crate::{
    blob::BlobId, database::connection::DieselDatabase, error::DepotError, timestamp, DepotResult,
};

/// Upper bound on records returned by one read.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Number of blob ids returned by [`SoftDeletedBlobStore::read_oldest_records`].
pub const OLDEST_RECORDS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeletedBlobRecord {
    pub record_id: i64,
    pub blob_id: BlobId,
    pub source_blob_store_name: String,
    /// RFC 3339 time the record was created.
    pub deleted_date: String,
    pub date_path_ref: Option<String>,
}

impl TryFrom<SoftDeletedBlob> for SoftDeletedBlobRecord {
    type Error = DepotError;

    fn try_from(row: SoftDeletedBlob) -> Result<Self, Self::Error> {
        Ok(Self {
            record_id: row.record_id,
            blob_id: row.blob_id.parse()?,
            source_blob_store_name: row.source_blob_store_name,
            deleted_date: row.deleted_date,
            date_path_ref: row.date_path_ref,
        })
    }
}

/// One page of results plus the token to fetch the next one.
#[derive(Debug, Clone)]
pub struct Continuation<T> {
    pub items: Vec<T>,
    /// `None` once the last page has been returned.
    pub next_token: Option<String>,
}

/// Lazily streamed blob ids, see [`SoftDeletedBlobStore::read_all_blob_ids`].
pub type BlobIdStream = Box<dyn Iterator<Item = DepotResult<BlobId>> + Send>;

pub trait SoftDeletedBlobStore: Send + Sync {
    /// Appends a record for `blob_id` and returns its record id.
    fn create_record(&self, blob_id: &BlobId, store: &str) -> DepotResult<i64>;

    /// Reads up to `min(limit, 1000)` records after `token`, ascending by record id.
    fn read_records(
        &self,
        token: Option<&str>,
        limit: usize,
        store: &str,
    ) -> DepotResult<Continuation<SoftDeletedBlobRecord>>;

    /// Streams every blob id of `store` in record order, fetching in chunks.
    ///
    /// The stream is finite and cannot be restarted.
    fn read_all_blob_ids(&self, store: &str) -> BlobIdStream;

    /// Removes the record(s) of `blob_id`. Returns the number removed, `0` if none existed.
    fn delete_record(&self, store: &str, blob_id: &BlobId) -> DepotResult<usize>;

    fn delete_all_records(&self, store: &str) -> DepotResult<usize>;

    fn count(&self, store: &str) -> DepotResult<u64>;

    /// The 20 blob ids with the oldest deletion dates.
    fn read_oldest_records(&self, store: &str) -> DepotResult<Vec<BlobId>>;

    fn has_record(&self, store: &str, blob_id: &BlobId) -> DepotResult<bool>;
}

pub struct SqlSoftDeletedBlobStore {
    db: DieselDatabase,
}

impl SqlSoftDeletedBlobStore {
    pub fn new(db: DieselDatabase) -> Self {
        Self {
            db,
        }
    }
}

fn parse_token(token: Option<&str>) -> DepotResult<Option<i64>> {
    token
        .map(|t| {
            t.parse::<i64>()
                .map_err(|_| DepotError::InvalidToken(t.to_string()))
        })
        .transpose()
}

impl SoftDeletedBlobStore for SqlSoftDeletedBlobStore {
    fn create_record(&self, blob_id: &BlobId, store: &str) -> DepotResult<i64> {
        let deleted_date = timestamp();
        let date_path_ref = blob_id.date_path();
        let record = NewSoftDeletedBlob {
            source_blob_store_name: store,
            blob_id: blob_id.as_str(),
            deleted_date: &deleted_date,
            date_path_ref: date_path_ref.as_deref(),
        };

        let record_id = self
            .db
            .transaction(|conn| SoftDeletedBlobRepository::insert(conn, &record))?;
        debug!(store, blob_id = %blob_id, record_id, "recorded soft-deleted blob");
        Ok(record_id)
    }

    fn read_records(
        &self,
        token: Option<&str>,
        limit: usize,
        store: &str,
    ) -> DepotResult<Continuation<SoftDeletedBlobRecord>> {
        let after = parse_token(token)?;
        let limit = limit.min(MAX_PAGE_SIZE);
        if limit == 0 {
            return Ok(Continuation {
                items: Vec::new(),
                next_token: None,
            });
        }

        let rows = self
            .db
            .with_conn(|conn| SoftDeletedBlobRepository::page(conn, store, after, limit as i64))?;

        let next_token = if rows.len() == limit {
            rows.last().map(|row| row.record_id.to_string())
        } else {
            None
        };
        let items = rows
            .into_iter()
            .map(SoftDeletedBlobRecord::try_from)
            .collect::<DepotResult<Vec<_>>>()?;

        Ok(Continuation {
            items,
            next_token,
        })
    }

    fn read_all_blob_ids(&self, store: &str) -> BlobIdStream {
        Box::new(LedgerBlobIds::new(self.db.clone(), store))
    }

    fn delete_record(&self, store: &str, blob_id: &BlobId) -> DepotResult<usize> {
        self.db.transaction(|conn| {
            SoftDeletedBlobRepository::delete_by_blob_id(conn, store, blob_id.as_str())
        })
    }

    fn delete_all_records(&self, store: &str) -> DepotResult<usize> {
        let removed = self
            .db
            .transaction(|conn| SoftDeletedBlobRepository::delete_by_store(conn, store))?;
        debug!(store, removed, "cleared soft-deleted blob records");
        Ok(removed)
    }

    fn count(&self, store: &str) -> DepotResult<u64> {
        let count = self
            .db
            .with_conn(|conn| SoftDeletedBlobRepository::count(conn, store))?;
        Ok(count.max(0) as u64)
    }

    fn read_oldest_records(&self, store: &str) -> DepotResult<Vec<BlobId>> {
        let ids = self.db.with_conn(|conn| {
            SoftDeletedBlobRepository::oldest(conn, store, OLDEST_RECORDS_LIMIT as i64)
        })?;
        ids.iter().map(|id| id.parse()).collect()
    }

    fn has_record(&self, store: &str, blob_id: &BlobId) -> DepotResult<bool> {
        self.db
            .with_conn(|conn| SoftDeletedBlobRepository::exists(conn, store, blob_id.as_str()))
    }
}

/// Keyset cursor over the ledger of one store.
///
/// The connection is only locked while a chunk loads.
struct LedgerBlobIds {
    db: DieselDatabase,
    store: String,
    last_record_id: i64,
    buffer: VecDeque<(i64, String)>,
    exhausted: bool,
}

impl LedgerBlobIds {
    fn new(db: DieselDatabase, store: &str) -> Self {
        Self {
            db,
            store: store.to_string(),
            last_record_id: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> DepotResult<()> {
        let chunk = self.db.with_conn(|conn| {
            SoftDeletedBlobRepository::blob_ids_after(
                conn,
                &self.store,
                self.last_record_id,
                MAX_PAGE_SIZE as i64,
            )
        })?;

        if chunk.len() < MAX_PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some((record_id, _)) = chunk.last() {
            self.last_record_id = *record_id;
        }
        self.buffer.extend(chunk);
        Ok(())
    }
}

impl Iterator for LedgerBlobIds {
    type Item = DepotResult<BlobId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                warn!(store = %self.store, error = %err, "failed to read soft-deleted blob ids");
                self.exhausted = true;
                return Some(Err(err));
            }
        }

        let (_, blob_id) = self.buffer.pop_front()?;
        Some(blob_id.parse())
    }
}
