use std::{collections::BTreeMap, fs::File, io::Read};

use depot_core::{
    blob::{headers, Blob, BlobId},
    DepotResult,
};
use depot_events::DepotEvent;
use tracing::debug;

use crate::DepotContext;

/// What to record about a blob when storing it.
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub repository: String,
    /// Asset path within the repository.
    pub path: String,
    pub content_type: Option<String>,
    pub created_by: Option<String>,
}

impl PutOptions {
    fn into_headers(self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::from([
            (headers::BLOB_NAME.to_string(), self.path),
            (headers::REPO_NAME.to_string(), self.repository),
        ]);
        if let Some(content_type) = self.content_type {
            headers.insert(headers::CONTENT_TYPE.to_string(), content_type);
        }
        if let Some(created_by) = self.created_by {
            headers.insert(headers::CREATED_BY.to_string(), created_by);
        }
        headers
    }
}

/// Stores `reader` as a new blob in `store`.
pub fn put_blob<R: Read>(
    ctx: &DepotContext,
    store: &str,
    reader: &mut R,
    options: PutOptions,
) -> DepotResult<Blob> {
    let blob_store = ctx.open_store(store)?;
    let blob = blob_store.create(reader, options.into_headers())?;

    ctx.events().emit(DepotEvent::BlobCreated {
        store: store.to_string(),
        blob_id: blob.id().to_string(),
        size: blob.size(),
    });
    Ok(blob)
}

/// Opens a live blob for reading.
pub fn open_blob(ctx: &DepotContext, store: &str, id: &BlobId) -> DepotResult<Option<(Blob, File)>> {
    ctx.open_store(store)?.open(id)
}

/// Soft-deletes a blob. Returns `false` when it was not live.
pub fn delete_blob(ctx: &DepotContext, store: &str, id: &BlobId, reason: &str) -> DepotResult<bool> {
    let deleted = ctx.open_store(store)?.delete(id, reason)?;
    if deleted {
        ctx.events().emit(DepotEvent::BlobSoftDeleted {
            store: store.to_string(),
            blob_id: id.to_string(),
            reason: reason.to_string(),
        });
    } else {
        debug!(store, blob_id = %id, "blob not live, nothing deleted");
    }
    Ok(deleted)
}

/// Makes a soft-deleted blob live again. Returns `false` when it was not soft-deleted.
pub fn undelete_blob(ctx: &DepotContext, store: &str, id: &BlobId) -> DepotResult<bool> {
    let undeleted = ctx.open_store(store)?.undelete(id)?;
    if undeleted {
        ctx.events().emit(DepotEvent::BlobUndeleted {
            store: store.to_string(),
            blob_id: id.to_string(),
        });
    }
    Ok(undeleted)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use depot_events::DepotEvent;

    use super::*;
    use crate::context::test_support::test_context;

    fn options(path: &str) -> PutOptions {
        PutOptions {
            repository: "raw-hosted".into(),
            path: path.into(),
            content_type: Some("text/plain".into()),
            created_by: Some("tester".into()),
        }
    }

    #[test]
    fn test_put_open_delete_undelete() {
        let (_dir, ctx, events) = test_context();

        let blob = put_blob(&ctx, "default", &mut Cursor::new(b"hello"), options("a.txt")).unwrap();
        assert_eq!(blob.header(headers::CONTENT_TYPE), Some("text/plain"));
        assert_eq!(blob.header(headers::CREATED_BY), Some("tester"));

        let (_, mut file) = open_blob(&ctx, "default", blob.id()).unwrap().unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");

        assert!(delete_blob(&ctx, "default", blob.id(), "cleanup").unwrap());
        assert!(!delete_blob(&ctx, "default", blob.id(), "cleanup").unwrap());
        assert!(open_blob(&ctx, "default", blob.id()).unwrap().is_none());

        assert!(undelete_blob(&ctx, "default", blob.id()).unwrap());
        assert!(!undelete_blob(&ctx, "default", blob.id()).unwrap());

        let kinds: Vec<_> = events
            .events()
            .into_iter()
            .map(|event| {
                match event {
                    DepotEvent::BlobCreated { .. } => "created",
                    DepotEvent::BlobSoftDeleted { .. } => "deleted",
                    DepotEvent::BlobUndeleted { .. } => "undeleted",
                    _ => "other",
                }
            })
            .collect();
        assert_eq!(kinds, vec!["created", "deleted", "undeleted"]);
    }
}
