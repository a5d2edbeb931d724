use std::sync::Arc;

use depot_core::{error::DepotError, restore::RestoreOptions, DepotResult};
use depot_operations::{
    compact::compact_store,
    reconcile::{reconcile_metrics, verify_store},
    restore::restore_store,
    store, CancellationToken, CompactReport, CompactionMode, DepotContext, FailedBlob,
    ReconcileReport, RestoreReport, VerifyReport,
};
use depot_utils::bytes::{format_bytes, format_signed_bytes};
use nu_ansi_term::Color::{Blue, Green, Red, Yellow};
use tracing::{error, info, warn};

use crate::utils::{key_value_table, print_json, Colored};

/// Runs a blocking operation off the async runtime so Ctrl-C stays responsive.
async fn run_blocking<T, F>(ctx: &Arc<DepotContext>, op: F) -> DepotResult<T>
where
    T: Send + 'static,
    F: FnOnce(&DepotContext) -> DepotResult<T> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    tokio::task::spawn_blocking(move || op(&ctx))
        .await
        .map_err(|err| DepotError::Custom(format!("operation task failed: {err}")))?
}

fn report_failures(failed: &[FailedBlob]) {
    for failure in failed {
        error!("{} {}: {}", Colored(Red, "✗"), failure.blob_id, failure.error);
    }
}

fn report_cancelled(cancelled: bool) {
    if cancelled {
        warn!(
            "{} Stopped early, blobs processed so far are kept",
            Colored(Yellow, "!")
        );
    }
}

fn print_compact(store: &str, report: &CompactReport) {
    report_failures(&report.failed);
    info!(
        "\n{}",
        key_value_table(
            &format!("Compacted {store}"),
            [
                ("Removed", report.removed.to_string()),
                ("Freed", format_bytes(report.freed, 2)),
                ("Stale records", report.stale.to_string()),
                ("Retained", report.retained.to_string()),
                ("Failed", report.failed.len().to_string()),
            ],
        )
    );
    report_cancelled(report.cancelled);
}

pub async fn compact(
    ctx: &Arc<DepotContext>,
    store: String,
    oldest: bool,
    cancel: CancellationToken,
    json: bool,
) -> DepotResult<()> {
    let mode = if oldest {
        CompactionMode::Oldest
    } else {
        CompactionMode::All
    };
    let name = store.clone();
    let report = run_blocking(ctx, move |ctx| compact_store(ctx, &name, mode, &cancel)).await?;

    if json {
        return print_json(&report);
    }
    print_compact(&store, &report);
    Ok(())
}

fn print_restore(store: &str, report: &RestoreReport, dry_run: bool) {
    report_failures(&report.failed);
    let mut rows = vec![
        ("Restored", report.restored.to_string()),
        ("Skipped", report.skipped.to_string()),
        ("Undeleted", report.undeleted.to_string()),
        ("Failed", report.failed.len().to_string()),
    ];
    if dry_run {
        rows.insert(0, ("Would restore", report.would_restore.to_string()));
    }
    let title = if dry_run {
        format!("Restore of {store} (dry run)")
    } else {
        format!("Restored {store}")
    };
    info!("\n{}", key_value_table(&title, rows));
    report_cancelled(report.cancelled);
}

pub async fn restore(
    ctx: &Arc<DepotContext>,
    store: String,
    options: RestoreOptions,
    cancel: CancellationToken,
    json: bool,
) -> DepotResult<()> {
    let name = store.clone();
    let report = run_blocking(ctx, move |ctx| restore_store(ctx, &name, options, &cancel)).await?;

    if json {
        return print_json(&report);
    }
    print_restore(&store, &report, options.dry_run);
    Ok(())
}

fn print_reconcile(store: &str, report: &ReconcileReport) {
    info!(
        "\n{}",
        key_value_table(
            &format!("Reconciled {store}"),
            [
                (
                    "Blobs",
                    format!("{} (was {})", report.blob_count, report.previous_count)
                ),
                (
                    "Total size",
                    format!(
                        "{} (was {})",
                        format_bytes(report.total_size, 2),
                        format_signed_bytes(report.previous_size, 2)
                    )
                ),
                ("Soft-deleted", report.soft_deleted.to_string()),
            ],
        )
    );
    report_cancelled(report.cancelled);
}

pub async fn reconcile(
    ctx: &Arc<DepotContext>,
    store: String,
    cancel: CancellationToken,
    json: bool,
) -> DepotResult<()> {
    let name = store.clone();
    let report = run_blocking(ctx, move |ctx| reconcile_metrics(ctx, &name, &cancel)).await?;

    if json {
        return print_json(&report);
    }
    print_reconcile(&store, &report);
    Ok(())
}

fn print_verify(store: &str, report: &VerifyReport) {
    report_failures(&report.failed);
    for blob_id in &report.corrupt {
        error!("{} {blob_id}: content does not match its digest", Colored(Red, "✗"));
    }
    info!(
        "\n{}",
        key_value_table(
            &format!("Verified {store}"),
            [
                ("Checked", report.checked.to_string()),
                ("Corrupt", report.corrupt.len().to_string()),
                ("Unreadable", report.failed.len().to_string()),
            ],
        )
    );
    report_cancelled(report.cancelled);
}

pub async fn verify(
    ctx: &Arc<DepotContext>,
    store: String,
    cancel: CancellationToken,
    json: bool,
) -> DepotResult<()> {
    let name = store.clone();
    let report = run_blocking(ctx, move |ctx| verify_store(ctx, &name, &cancel)).await?;

    if json {
        return print_json(&report);
    }
    print_verify(&store, &report);
    Ok(())
}

pub fn rebuild_index(ctx: &DepotContext, name: &str, json: bool) -> DepotResult<()> {
    let added = store::rebuild_deleted_index(ctx, name)?;
    if json {
        return print_json(&serde_json::json!({ "store": name, "added": added }));
    }
    if added == 0 {
        info!("{} Ledger of {} is complete", Colored(Green, "✓"), Colored(Blue, name));
    } else {
        info!(
            "{} Added {} missing ledger records to {}",
            Colored(Green, "✓"),
            added,
            Colored(Blue, name)
        );
    }
    Ok(())
}
