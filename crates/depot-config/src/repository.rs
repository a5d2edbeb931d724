use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// Repository formats that can be restored from blobs.
pub const SUPPORTED_FORMATS: [&str; 4] = ["raw", "maven2", "npm", "apt"];

/// A repository whose assets are stored in a blob store.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct RepositoryConfig {
    /// Unique name of the repository.
    pub name: String,

    /// Repository format: one of "raw", "maven2", "npm", "apt".
    pub format: String,

    /// Name of the blob store holding this repository's content.
    pub blob_store: String,

    /// Whether assets of this repository may be recreated from blobs.
    /// Default: true
    pub restorable: Option<bool>,
}

impl RepositoryConfig {
    pub fn is_restorable(&self) -> bool {
        self.restorable.unwrap_or(true)
    }
}
