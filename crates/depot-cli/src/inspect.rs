use depot_core::DepotResult;
use depot_operations::{restore, DepotContext};
use nu_ansi_term::Color::{Blue, Cyan, Yellow};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};
use tracing::info;

use crate::utils::{print_json, Colored};

#[derive(Serialize)]
struct RecordOutput {
    record_id: i64,
    blob_id: String,
    deleted_date: String,
    date_path_ref: Option<String>,
}

#[derive(Serialize)]
struct PageOutput {
    records: Vec<RecordOutput>,
    next_token: Option<String>,
}

pub fn list_records(
    ctx: &DepotContext,
    store: &str,
    token: Option<&str>,
    limit: usize,
    json: bool,
) -> DepotResult<()> {
    let page = ctx.ledger()?.read_records(token, limit, store)?;

    if json {
        let records = page
            .items
            .into_iter()
            .map(|record| {
                RecordOutput {
                    record_id: record.record_id,
                    blob_id: record.blob_id.to_string(),
                    deleted_date: record.deleted_date,
                    date_path_ref: record.date_path_ref,
                }
            })
            .collect();
        return print_json(&PageOutput {
            records,
            next_token: page.next_token,
        });
    }

    if page.items.is_empty() {
        info!("No soft-deleted blobs in {}", Colored(Blue, store));
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(["Record", "Blob", "Deleted", "Date path"].map(String::from));
    for record in &page.items {
        builder.push_record([
            record.record_id.to_string(),
            Colored(Cyan, &record.blob_id).to_string(),
            record.deleted_date.clone(),
            record.date_path_ref.clone().unwrap_or_else(|| "-".into()),
        ]);
    }
    info!("\n{}", builder.build().with(Style::rounded()));

    match page.next_token {
        Some(token) => {
            info!(
                "More records follow, continue with {}",
                Colored(Yellow, format!("--token {token}"))
            )
        }
        None => info!("{} records", page.items.len()),
    }
    Ok(())
}

pub fn count_records(ctx: &DepotContext, store: &str, json: bool) -> DepotResult<()> {
    let count = ctx.ledger()?.count(store)?;
    if json {
        return print_json(&serde_json::json!({ "store": store, "count": count }));
    }
    info!(
        "{} soft-deleted blobs pending compaction in {}",
        Colored(Yellow, count),
        Colored(Blue, store)
    );
    Ok(())
}

pub fn oldest_records(ctx: &DepotContext, store: &str, json: bool) -> DepotResult<()> {
    let ids: Vec<String> = ctx
        .ledger()?
        .read_oldest_records(store)?
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    if json {
        return print_json(&ids);
    }
    if ids.is_empty() {
        info!("No soft-deleted blobs in {}", Colored(Blue, store));
    }
    for id in ids {
        info!("{}", Colored(Cyan, id));
    }
    Ok(())
}

pub fn list_assets(
    ctx: &DepotContext,
    repository: Option<&str>,
    limit: Option<i64>,
    json: bool,
) -> DepotResult<()> {
    let assets = restore::list_assets(ctx, repository, limit)?;
    if json {
        return print_json(&assets);
    }
    if assets.is_empty() {
        info!("No assets recorded");
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(["Repository", "Path", "Kind", "Component", "Created"].map(String::from));
    for asset in &assets {
        builder.push_record([
            Colored(Blue, &asset.repository).to_string(),
            asset.path.clone(),
            asset.kind.clone().unwrap_or_else(|| "-".into()),
            asset
                .component_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".into()),
            asset.created.clone(),
        ]);
    }
    info!("\n{}", builder.build().with(Style::rounded()));
    info!("{} assets", assets.len());
    Ok(())
}
