use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// A file-backed blob store.
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct BlobStoreConfig {
    /// Unique name of the blob store.
    pub name: String,

    /// Directory holding the store's content.
    /// Default: $DEPOT_ROOT/blobs/<name>
    pub path: Option<String>,
}
