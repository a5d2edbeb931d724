use std::path::Path;

use depot_config::{blob_store::BlobStoreConfig, config::Config};
use depot_core::{error::DepotError, DepotResult};
use depot_db::models::metrics::BlobStoreMetrics;
use depot_operations::{store, DepotContext, MetricsReset, StoreInfo};
use depot_utils::bytes::format_signed_bytes;
use nu_ansi_term::Color::{Blue, Cyan, Green, Yellow};
use tabled::{builder::Builder, settings::Style};
use tracing::info;

use crate::{
    cli::ResetTarget,
    utils::{key_value_table, print_json, Colored},
};

fn metrics_rows(metrics: &BlobStoreMetrics) -> Vec<(&'static str, String)> {
    vec![
        ("Blobs", metrics.blob_count.to_string()),
        ("Total size", format_signed_bytes(metrics.total_size, 2)),
        (
            "Uploads",
            format!(
                "{} ({}, {} errors)",
                metrics.upload_count,
                format_signed_bytes(metrics.upload_bytes, 2),
                metrics.upload_errors
            ),
        ),
        (
            "Downloads",
            format!(
                "{} ({}, {} errors)",
                metrics.download_count,
                format_signed_bytes(metrics.download_bytes, 2),
                metrics.download_errors
            ),
        ),
        ("Deletes", metrics.delete_count.to_string()),
        ("Updated", metrics.updated.clone()),
    ]
}

pub fn list_stores(ctx: &DepotContext, json: bool) -> DepotResult<()> {
    let stores = store::list_stores(ctx)?;
    if json {
        return print_json(&stores);
    }

    let mut builder = Builder::new();
    builder.push_record(["Store", "Path", "Blobs", "Size", "Pending", "Repositories"].map(String::from));
    for info in &stores {
        let (count, size) = info
            .metrics
            .as_ref()
            .map(|m| (m.blob_count.to_string(), format_signed_bytes(m.total_size, 2)))
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
        builder.push_record([
            Colored(Blue, &info.name).to_string(),
            info.path.display().to_string(),
            count,
            size,
            info.pending_compaction.to_string(),
            info.repositories.join(", "),
        ]);
    }

    let table = builder.build().with(Style::rounded()).to_string();
    info!("\n{table}");
    Ok(())
}

pub fn show_metrics(ctx: &DepotContext, name: &str, json: bool) -> DepotResult<()> {
    let store = ctx.open_store(name)?;
    let Some(metrics) = store.metrics().get(name)? else {
        info!("No metrics recorded for {}", Colored(Blue, name));
        return Ok(());
    };
    if json {
        return print_json(&metrics);
    }

    let mut rows = metrics_rows(&metrics);
    rows.push(("Pending compaction", store.ledger().count(name)?.to_string()));
    info!("\n{}", key_value_table(&format!("Blob store {name}"), rows));
    Ok(())
}

/// Adds the store to the config file when it is not there yet.
pub fn add_store_to_config(
    config_path: &Path,
    config: &mut Config,
    name: &str,
    path: Option<String>,
) -> DepotResult<()> {
    if config.get_blob_store(name).is_some() {
        if path.is_some() {
            return Err(DepotError::Custom(format!(
                "Blob store '{name}' already exists; edit its path in {}",
                config_path.display()
            )));
        }
        return Ok(());
    }

    config.blob_stores.push(BlobStoreConfig {
        name: name.to_string(),
        path,
    });
    config.resolve()?;
    config.save(config_path)?;
    Ok(())
}

pub fn create_store(ctx: &DepotContext, name: &str, json: bool) -> DepotResult<()> {
    let info = store::create_store(ctx, name)?;
    print_store(&info, json)
}

fn print_store(info: &StoreInfo, json: bool) -> DepotResult<()> {
    if json {
        return print_json(info);
    }
    info!(
        "{} Blob store {} ready at {}",
        Colored(Green, "✓"),
        Colored(Blue, &info.name),
        Colored(Cyan, info.path.display())
    );
    Ok(())
}

pub fn remove_store(
    ctx: &DepotContext,
    config_path: &Path,
    name: &str,
    force: bool,
    json: bool,
) -> DepotResult<()> {
    let users: Vec<_> = ctx
        .config()
        .repositories_in_store(name)
        .map(|repo| repo.name.clone())
        .collect();
    if !users.is_empty() && !force {
        return Err(DepotError::Custom(format!(
            "Blob store '{name}' is used by {}; pass --force to remove it anyway",
            users.join(", ")
        )));
    }

    let report = store::remove_store(ctx, name)?;

    let mut config = ctx.config().clone();
    config.blob_stores.retain(|store| store.name != name);
    config.repositories.retain(|repo| repo.blob_store != name);
    config.save(config_path)?;

    if json {
        return print_json(&report);
    }
    info!(
        "{} Removed blob store {} ({} ledger records dropped)",
        Colored(Green, "✓"),
        Colored(Blue, name),
        report.ledger_records
    );
    if !users.is_empty() {
        info!(
            "{} Repositories removed from config: {}",
            Colored(Yellow, "!"),
            users.join(", ")
        );
    }
    Ok(())
}

pub fn reset_metrics(ctx: &DepotContext, name: &str, target: ResetTarget) -> DepotResult<()> {
    let reset = match target {
        ResetTarget::Operations => MetricsReset::Operations,
        ResetTarget::Counts => MetricsReset::Counts,
        ResetTarget::All => MetricsReset::All,
    };
    store::reset_metrics(ctx, name, reset)?;
    info!("{} Metrics of {} reset", Colored(Green, "✓"), Colored(Blue, name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_add_store_to_config_persists_new_store() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut config = Config::default_config();

        add_store_to_config(&config_path, &mut config, "archive", Some("/srv/archive".into()))
            .unwrap();

        let loaded = Config::load(&config_path).unwrap();
        let store = loaded.get_blob_store("archive").unwrap();
        assert_eq!(store.path.as_deref(), Some("/srv/archive"));
        assert!(loaded.get_blob_store("default").is_some());
    }

    #[test]
    fn test_add_store_to_config_existing_store() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut config = Config::default_config();

        add_store_to_config(&config_path, &mut config, "default", None).unwrap();
        assert!(!config_path.exists());

        let err = add_store_to_config(&config_path, &mut config, "default", Some("/tmp/x".into()));
        assert!(err.is_err());
    }
}
