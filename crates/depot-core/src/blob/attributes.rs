use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{DepotError, ErrorContext},
    DepotResult,
};

/// Well-known header names.
pub mod headers {
    /// Path of the asset within its repository.
    pub const BLOB_NAME: &str = "BlobStore.blob-name";
    /// Repository the blob was written for.
    pub const REPO_NAME: &str = "Bucket.repo-name";
    pub const CONTENT_TYPE: &str = "BlobStore.content-type";
    pub const CREATED_BY: &str = "BlobStore.created-by";
}

/// Facts computed while the content was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetrics {
    /// RFC 3339 creation time.
    pub created: String,
    pub sha256: String,
    pub blake3: String,
    pub content_size: u64,
}

/// Contents of a blob's `<id>.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobAttributes {
    pub headers: BTreeMap<String, String>,
    pub metrics: BlobMetrics,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_reason: Option<String>,
    /// RFC 3339 time of the soft delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_date_time: Option<String>,
}

impl BlobAttributes {
    pub fn new(headers: BTreeMap<String, String>, metrics: BlobMetrics) -> Self {
        Self {
            headers,
            metrics,
            deleted: false,
            deleted_reason: None,
            deleted_date_time: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn mark_deleted(&mut self, reason: &str, at: String) {
        self.deleted = true;
        self.deleted_reason = Some(reason.to_string());
        self.deleted_date_time = Some(at);
    }

    pub fn clear_deleted(&mut self) {
        self.deleted = false;
        self.deleted_reason = None;
        self.deleted_date_time = None;
    }

    /// Reads attributes from `path`; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path, blob_id: &str) -> DepotResult<Option<Self>> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(DepotError::IoError {
                    action: format!("reading attributes {}", path.display()),
                    source: err,
                })
            }
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|err| {
                DepotError::InvalidAttributes {
                    blob_id: blob_id.to_string(),
                    reason: err.to_string(),
                }
            })
    }

    /// Writes through a uniquely named sibling temp file and a rename so readers never see a
    /// torn file.
    pub fn store(&self, path: &Path) -> DepotResult<()> {
        let serialized = serde_json::to_vec_pretty(self)
            .map_err(|err| DepotError::Custom(format!("serializing blob attributes: {err}")))?;
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));

        fs::write(&tmp, serialized)
            .with_context(|| format!("writing attributes {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} into place", tmp.display()))?;
        Ok(())
    }
}
