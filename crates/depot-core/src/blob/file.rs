use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use depot_db::models::metrics::BlobStoreMetrics;
use depot_utils::{
    fs::{ensure_dir_exists, safe_remove, FileWalker},
    hash::{verify_checksum, HashingWriter},
    lock::FileLock,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    blob::{
        attributes::{headers, BlobAttributes, BlobMetrics},
        id::BlobId,
    },
    error::{DepotError, ErrorContext},
    ledger::SoftDeletedBlobStore,
    metrics::BlobStoreMetricsStore,
    timestamp, DepotResult,
};

/// Result of [`FileBlobStore::purge_deleted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purged {
    /// Content and attributes were removed; carries the freed size.
    Removed(u64),
    /// The soft-deleted blob was kept.
    Retained,
    /// The blob had been undeleted.
    Live,
    Missing,
}

/// A blob as found on disk.
#[derive(Debug, Clone)]
pub struct Blob {
    id: BlobId,
    attributes: BlobAttributes,
    content_path: PathBuf,
}

impl Blob {
    pub fn id(&self) -> &BlobId {
        &self.id
    }

    pub fn attributes(&self) -> &BlobAttributes {
        &self.attributes
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.attributes.header(name)
    }

    pub fn size(&self) -> u64 {
        self.attributes.metrics.content_size
    }

    pub fn is_deleted(&self) -> bool {
        self.attributes.deleted
    }

    pub fn content_path(&self) -> &Path {
        &self.content_path
    }

    pub fn open_content(&self) -> DepotResult<File> {
        File::open(&self.content_path)
            .with_context(|| format!("opening blob content {}", self.content_path.display()))
    }

    /// Re-hashes the content and compares it with the BLAKE3 digest recorded at creation.
    pub fn verify_content(&self) -> DepotResult<bool> {
        Ok(verify_checksum(
            &self.content_path,
            &self.attributes.metrics.blake3,
        )?)
    }
}

/// Blob store laid out on the local file system.
///
/// ```text
/// <root>/content/<date path or vol-NN/chap-NN>/<id>.bytes
/// <root>/content/<date path or vol-NN/chap-NN>/<id>.json
/// <root>/tmp/
/// ```
pub struct FileBlobStore {
    name: String,
    root: PathBuf,
    metrics: Arc<dyn BlobStoreMetricsStore>,
    ledger: Arc<dyn SoftDeletedBlobStore>,
}

impl FileBlobStore {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        metrics: Arc<dyn BlobStoreMetricsStore>,
        ledger: Arc<dyn SoftDeletedBlobStore>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            metrics,
            ledger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger(&self) -> &Arc<dyn SoftDeletedBlobStore> {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<dyn BlobStoreMetricsStore> {
        &self.metrics
    }

    fn content_root(&self) -> PathBuf {
        self.root.join("content")
    }

    fn bytes_path(&self, id: &BlobId) -> PathBuf {
        self.root
            .join(id.relative_dir())
            .join(format!("{id}.bytes"))
    }

    fn attributes_path(&self, id: &BlobId) -> PathBuf {
        self.root
            .join(id.relative_dir())
            .join(format!("{id}.json"))
    }

    /// Serialises lifecycle transitions of one blob across threads and processes.
    ///
    /// Ids hash onto a fixed set of lock files under `<root>/locks`.
    fn lock_blob(&self, id: &BlobId) -> DepotResult<FileLock> {
        let stripe = blake3::hash(id.as_str().as_bytes()).as_bytes()[0];
        Ok(FileLock::acquire(
            self.root.join("locks"),
            &format!("blob-{stripe:02x}"),
        )?)
    }

    fn delta(&self) -> BlobStoreMetrics {
        BlobStoreMetrics::new(&self.name)
    }

    /// Streams `reader` into a new blob.
    ///
    /// Content is hashed while it is written to a temp file, then moved into place before the
    /// attributes are written, so a blob with attributes always has complete content.
    pub fn create<R: Read>(
        &self,
        reader: &mut R,
        headers: BTreeMap<String, String>,
    ) -> DepotResult<Blob> {
        if !headers.contains_key(headers::BLOB_NAME) {
            return Err(DepotError::MissingHeader(headers::BLOB_NAME));
        }

        let now = Utc::now();
        let id = BlobId::generate(now);

        let result = self.write_content(&id, reader);
        let (digest, content_path) = match result {
            Ok(written) => written,
            Err(err) => {
                let delta = BlobStoreMetrics {
                    upload_errors: 1,
                    ..self.delta()
                };
                if let Err(metrics_err) = self.metrics.update_metrics(&delta) {
                    warn!(store = %self.name, error = %metrics_err, "failed to count upload error");
                }
                return Err(err);
            }
        };

        let attributes = BlobAttributes::new(
            headers,
            BlobMetrics {
                created: timestamp(),
                sha256: digest.sha256,
                blake3: digest.blake3,
                content_size: digest.size,
            },
        );
        attributes.store(&self.attributes_path(&id))?;

        let size = digest.size as i64;
        self.metrics.update_metrics(&BlobStoreMetrics {
            blob_count: 1,
            total_size: size,
            upload_count: 1,
            upload_bytes: size,
            ..self.delta()
        })?;

        debug!(store = %self.name, blob_id = %id, size, "created blob");
        Ok(Blob {
            id,
            attributes,
            content_path,
        })
    }

    fn write_content<R: Read>(
        &self,
        id: &BlobId,
        reader: &mut R,
    ) -> DepotResult<(depot_utils::hash::ContentDigest, PathBuf)> {
        let tmp_dir = self.root.join("tmp");
        ensure_dir_exists(&tmp_dir)?;
        let tmp_path = tmp_dir.join(format!("{}.bytes", Uuid::new_v4()));

        let written = (|| {
            let file = File::create(&tmp_path)
                .with_context(|| format!("creating {}", tmp_path.display()))?;
            let mut writer = HashingWriter::new(file);
            io::copy(reader, &mut writer)
                .with_context(|| format!("writing blob content to {}", tmp_path.display()))?;
            let (file, digest) = writer.finish();
            file.sync_all()
                .with_context(|| format!("syncing {}", tmp_path.display()))?;

            let content_path = self.bytes_path(id);
            if let Some(parent) = content_path.parent() {
                ensure_dir_exists(parent)?;
            }
            fs::rename(&tmp_path, &content_path)
                .with_context(|| format!("moving blob content to {}", content_path.display()))?;
            Ok::<_, DepotError>((digest, content_path))
        })();

        if written.is_err() {
            let _ = safe_remove(&tmp_path);
        }
        written
    }

    fn load(&self, id: &BlobId) -> DepotResult<Option<Blob>> {
        let Some(attributes) = BlobAttributes::load(&self.attributes_path(id), id.as_str())? else {
            return Ok(None);
        };
        Ok(Some(Blob {
            id: id.clone(),
            attributes,
            content_path: self.bytes_path(id),
        }))
    }

    /// Returns the blob when it exists and is live.
    pub fn get(&self, id: &BlobId) -> DepotResult<Option<Blob>> {
        Ok(self.load(id)?.filter(|blob| !blob.is_deleted()))
    }

    /// Returns the blob whether live or soft-deleted.
    pub fn get_including_deleted(&self, id: &BlobId) -> DepotResult<Option<Blob>> {
        self.load(id)
    }

    pub fn exists(&self, id: &BlobId) -> DepotResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Opens a live blob for reading and counts the download.
    pub fn open(&self, id: &BlobId) -> DepotResult<Option<(Blob, File)>> {
        let Some(blob) = self.get(id)? else {
            return Ok(None);
        };

        let file = match blob.open_content() {
            Ok(file) => file,
            Err(err) => {
                let delta = BlobStoreMetrics {
                    download_errors: 1,
                    ..self.delta()
                };
                if let Err(metrics_err) = self.metrics.update_metrics(&delta) {
                    warn!(store = %self.name, error = %metrics_err, "failed to count download error");
                }
                return Err(err);
            }
        };

        self.metrics.update_metrics(&BlobStoreMetrics {
            download_count: 1,
            download_bytes: blob.size() as i64,
            ..self.delta()
        })?;
        Ok(Some((blob, file)))
    }

    /// Soft-deletes a live blob.
    ///
    /// Returns `false` when the blob is missing or already soft-deleted.
    pub fn delete(&self, id: &BlobId, reason: &str) -> DepotResult<bool> {
        let _lock = self.lock_blob(id)?;
        let Some(mut blob) = self.get(id)? else {
            debug!(store = %self.name, blob_id = %id, "soft delete of missing or deleted blob ignored");
            return Ok(false);
        };

        blob.attributes.mark_deleted(reason, timestamp());
        blob.attributes.store(&self.attributes_path(id))?;
        self.ledger.create_record(id, &self.name)?;

        let size = blob.size() as i64;
        self.metrics.update_metrics(&BlobStoreMetrics {
            blob_count: -1,
            total_size: -size,
            delete_count: 1,
            ..self.delta()
        })?;

        debug!(store = %self.name, blob_id = %id, reason, "soft-deleted blob");
        Ok(true)
    }

    /// Makes a soft-deleted blob live again.
    ///
    /// Returns `false` when the blob is live or gone.
    pub fn undelete(&self, id: &BlobId) -> DepotResult<bool> {
        let _lock = self.lock_blob(id)?;
        let Some(mut blob) = self.load(id)? else {
            return Ok(false);
        };
        if !blob.is_deleted() {
            return Ok(false);
        }

        blob.attributes.clear_deleted();
        blob.attributes.store(&self.attributes_path(id))?;
        self.ledger.delete_record(&self.name, id)?;

        let size = blob.size() as i64;
        self.metrics.update_metrics(&BlobStoreMetrics {
            blob_count: 1,
            total_size: size,
            ..self.delta()
        })?;

        debug!(store = %self.name, blob_id = %id, "undeleted blob");
        Ok(true)
    }

    /// Removes content and attributes from disk along with any ledger record.
    ///
    /// A blob that was still live is also subtracted from count and size. Returns `false`
    /// when there was nothing on disk.
    pub fn delete_hard(&self, id: &BlobId) -> DepotResult<bool> {
        let _lock = self.lock_blob(id)?;
        let Some(blob) = self.load(id)? else {
            self.remove_files(id)?;
            return Ok(false);
        };

        self.remove_files(id)?;
        if !blob.is_deleted() {
            let size = blob.size() as i64;
            self.metrics.update_metrics(&BlobStoreMetrics {
                blob_count: -1,
                total_size: -size,
                delete_count: 1,
                ..self.delta()
            })?;
        }

        debug!(store = %self.name, blob_id = %id, "hard-deleted blob");
        Ok(true)
    }

    /// Hard-deletes a blob only while it is still soft-deleted.
    ///
    /// The state is re-read under the blob lock, so a blob undeleted after its ledger record
    /// was read is left alone. `retain` sees the soft-deleted blob and may keep it for now.
    /// The ledger record is dropped for live and missing blobs.
    pub fn purge_deleted(
        &self,
        id: &BlobId,
        retain: impl FnOnce(&Blob) -> bool,
    ) -> DepotResult<Purged> {
        let _lock = self.lock_blob(id)?;
        let blob = match self.load(id)? {
            Some(blob) if blob.is_deleted() => blob,
            Some(_) => {
                self.ledger.delete_record(&self.name, id)?;
                return Ok(Purged::Live);
            }
            None => {
                self.ledger.delete_record(&self.name, id)?;
                return Ok(Purged::Missing);
            }
        };
        if retain(&blob) {
            return Ok(Purged::Retained);
        }

        self.remove_files(id)?;
        debug!(store = %self.name, blob_id = %id, size = blob.size(), "purged soft-deleted blob");
        Ok(Purged::Removed(blob.size()))
    }

    fn remove_files(&self, id: &BlobId) -> DepotResult<()> {
        safe_remove(self.bytes_path(id))?;
        safe_remove(self.attributes_path(id))?;
        self.ledger.delete_record(&self.name, id)?;
        Ok(())
    }

    /// Lazily lists every blob id that has an attributes file, live or soft-deleted.
    pub fn blob_ids(&self) -> DepotResult<impl Iterator<Item = DepotResult<BlobId>>> {
        let walker = FileWalker::new(self.content_root())?;

        Ok(walker.filter_map(|entry| {
            let path = match entry {
                Ok(path) => path,
                Err(err) => return Some(Err(err.into())),
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            match stem.parse::<BlobId>() {
                Ok(id) => Some(Ok(id)),
                Err(_) => {
                    warn!(path = %path.display(), "ignoring file with unparseable blob id");
                    None
                }
            }
        }))
    }

    /// Appends ledger records for soft-deleted blobs that have none.
    ///
    /// Returns the number of records added.
    pub fn rebuild_deleted_index(&self) -> DepotResult<u64> {
        let mut added = 0;

        for id in self.blob_ids()? {
            let id = id?;
            let blob = match self.load(&id) {
                Ok(Some(blob)) => blob,
                Ok(None) => continue,
                Err(err) => {
                    warn!(store = %self.name, blob_id = %id, error = %err, "skipping unreadable blob");
                    continue;
                }
            };

            if !blob.is_deleted() || self.ledger.has_record(&self.name, &id)? {
                continue;
            }
            let _lock = self.lock_blob(&id)?;
            if self.load(&id)?.is_some_and(|blob| blob.is_deleted())
                && !self.ledger.has_record(&self.name, &id)?
            {
                self.ledger.create_record(&id, &self.name)?;
                added += 1;
            }
        }

        info!(store = %self.name, added, "rebuilt soft-deleted blob index");
        Ok(added)
    }
}
