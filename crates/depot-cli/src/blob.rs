use std::{
    fs::File,
    io::{self, Read},
};

use depot_core::{
    blob::{headers, BlobId},
    error::{DepotError, ErrorContext},
    DepotResult,
};
use depot_operations::{
    blob::{delete_blob, open_blob, put_blob, undelete_blob, PutOptions},
    DepotContext,
};
use depot_utils::{bytes::format_bytes, path::resolve_path};
use nu_ansi_term::Color::{Blue, Cyan, Green, Yellow};
use serde::Serialize;
use tracing::{info, warn};

use crate::utils::{print_json, Colored};

#[derive(Serialize)]
struct PutOutput<'a> {
    store: &'a str,
    blob_id: String,
    size: u64,
    sha256: &'a str,
}

pub fn put(
    ctx: &DepotContext,
    file: &str,
    repository: String,
    path: String,
    content_type: Option<String>,
    store: Option<String>,
    json: bool,
) -> DepotResult<()> {
    let repo = ctx
        .config()
        .get_repository(&repository)
        .ok_or_else(|| DepotError::UnknownRepository(repository.clone()))?;
    let store = store.unwrap_or_else(|| repo.blob_store.clone());

    let mut reader: Box<dyn Read> = if file == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file_path = resolve_path(file)?;
        Box::new(
            File::open(&file_path)
                .with_context(|| format!("opening {}", file_path.display()))?,
        )
    };

    let options = PutOptions {
        repository,
        path,
        content_type,
        created_by: std::env::var("USER").ok(),
    };
    let blob = put_blob(ctx, &store, &mut reader, options)?;

    if json {
        return print_json(&PutOutput {
            store: &store,
            blob_id: blob.id().to_string(),
            size: blob.size(),
            sha256: &blob.attributes().metrics.sha256,
        });
    }
    info!(
        "{} Stored {} in {} ({})",
        Colored(Green, "✓"),
        Colored(Cyan, blob.id()),
        Colored(Blue, &store),
        format_bytes(blob.size(), 2)
    );
    Ok(())
}

pub fn get(ctx: &DepotContext, store: &str, blob_id: &str, output: Option<&str>) -> DepotResult<()> {
    let id: BlobId = blob_id.parse()?;
    let Some((blob, mut content)) = open_blob(ctx, store, &id)? else {
        return Err(DepotError::BlobNotFound {
            store: store.to_string(),
            blob_id: blob_id.to_string(),
        });
    };

    match output {
        Some(output) => {
            let output_path = resolve_path(output)?;
            let mut file = File::create(&output_path)
                .with_context(|| format!("creating {}", output_path.display()))?;
            io::copy(&mut content, &mut file)
                .with_context(|| format!("writing {}", output_path.display()))?;
            info!(
                "{} Wrote {} ({}) to {}",
                Colored(Green, "✓"),
                Colored(Cyan, blob.header(headers::BLOB_NAME).unwrap_or(blob_id)),
                format_bytes(blob.size(), 2),
                output_path.display()
            );
        }
        None => {
            io::copy(&mut content, &mut io::stdout().lock())
                .with_context(|| "writing blob to stdout".to_string())?;
        }
    }
    Ok(())
}

pub fn delete(ctx: &DepotContext, store: &str, blob_ids: &[String], reason: &str) -> DepotResult<()> {
    for blob_id in blob_ids {
        let id: BlobId = blob_id.parse()?;
        if delete_blob(ctx, store, &id, reason)? {
            info!("{} Soft-deleted {}", Colored(Green, "✓"), Colored(Cyan, &id));
        } else {
            warn!("{} is not a live blob in {}", Colored(Yellow, &id), store);
        }
    }
    Ok(())
}

pub fn undelete(ctx: &DepotContext, store: &str, blob_ids: &[String]) -> DepotResult<()> {
    for blob_id in blob_ids {
        let id: BlobId = blob_id.parse()?;
        if undelete_blob(ctx, store, &id)? {
            info!("{} Undeleted {}", Colored(Green, "✓"), Colored(Cyan, &id));
        } else {
            warn!("{} is not a soft-deleted blob in {}", Colored(Yellow, &id), store);
        }
    }
    Ok(())
}
