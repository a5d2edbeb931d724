use std::sync::Arc;

use clap::Parser;
use cli::{Args, Commands, LedgerCommand, StoreCommand};
use depot_config::config::{self, generate_default_config, Config};
use depot_core::{restore::RestoreOptions, DepotResult};
use depot_events::{ChannelSink, EventSinkHandle, NullSink};
use depot_operations::{CancellationToken, DepotContext};
use depot_utils::path::resolve_path;
use events::EventGuard;
use logging::setup_logging;
use nu_ansi_term::Color::Yellow;
use tracing::{debug, warn};
use utils::{set_color, Colored};

mod blob;
mod cli;
mod events;
mod inspect;
mod logging;
mod maintenance;
mod store;
mod utils;

/// Cancels `token` on the first Ctrl-C so long operations stop between blobs.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(
                "{} Interrupted, finishing the current blob",
                Colored(Yellow, "!")
            );
            token.cancel();
        }
    });
}

async fn handle_cli() -> DepotResult<()> {
    let args = Args::parse();

    setup_logging(&args);
    set_color(!args.no_color);

    let config_path = match args.config {
        Some(ref path) => resolve_path(path)?,
        None => config::config_path(),
    };
    debug!(path = %config_path.display(), "using config");

    let mut config = match args.command {
        Commands::DefConfig => return Ok(generate_default_config(&config_path)?),
        _ => Config::load(&config_path)?,
    };
    if let Commands::Store(StoreCommand::Create {
        ref name,
        ref path,
    }) = args.command
    {
        store::add_store_to_config(&config_path, &mut config, name, path.clone())?;
    }

    let (events, _event_guard): (EventSinkHandle, Option<EventGuard>) = if args.quiet {
        (Arc::new(NullSink), None)
    } else {
        let (sink, receiver) = ChannelSink::new();
        (Arc::new(sink), Some(events::spawn_event_handler(receiver)))
    };
    let ctx = Arc::new(DepotContext::new(config, events));

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let json = args.json;
    match args.command {
        // written above, before any config is loaded
        Commands::DefConfig => {}
        Commands::Store(command) => {
            match command {
                StoreCommand::List => store::list_stores(&ctx, json)?,
                StoreCommand::Create {
                    name, ..
                } => store::create_store(&ctx, &name, json)?,
                StoreCommand::Remove {
                    name,
                    force,
                } => store::remove_store(&ctx, &config_path, &name, force, json)?,
                StoreCommand::Metrics {
                    name,
                } => store::show_metrics(&ctx, &name, json)?,
                StoreCommand::ResetMetrics {
                    name,
                    target,
                } => store::reset_metrics(&ctx, &name, target)?,
            }
        }
        Commands::Put {
            file,
            repository,
            path,
            content_type,
            store,
        } => blob::put(&ctx, &file, repository, path, content_type, store, json)?,
        Commands::Get {
            blob_id,
            output,
            store,
        } => blob::get(&ctx, &store, &blob_id, output.as_deref())?,
        Commands::Delete {
            blob_ids,
            reason,
            store,
        } => blob::delete(&ctx, &store, &blob_ids, &reason)?,
        Commands::Undelete {
            blob_ids,
            store,
        } => blob::undelete(&ctx, &store, &blob_ids)?,
        Commands::Ledger(command) => {
            match command {
                LedgerCommand::List {
                    store,
                    token,
                    limit,
                } => inspect::list_records(&ctx, &store, token.as_deref(), limit, json)?,
                LedgerCommand::Count {
                    store,
                } => inspect::count_records(&ctx, &store, json)?,
                LedgerCommand::Oldest {
                    store,
                } => inspect::oldest_records(&ctx, &store, json)?,
            }
        }
        Commands::Compact {
            store,
            oldest,
        } => maintenance::compact(&ctx, store, oldest, cancel, json).await?,
        Commands::Restore {
            store,
            dry_run,
            undelete,
        } => {
            let options = RestoreOptions {
                dry_run,
                undelete_referenced: undelete,
            };
            maintenance::restore(&ctx, store, options, cancel, json).await?
        }
        Commands::Assets {
            repository,
            limit,
        } => inspect::list_assets(&ctx, repository.as_deref(), limit, json)?,
        Commands::Reconcile {
            store,
        } => maintenance::reconcile(&ctx, store, cancel, json).await?,
        Commands::Verify {
            store,
        } => maintenance::verify(&ctx, store, cancel, json).await?,
        Commands::RebuildIndex {
            store,
        } => maintenance::rebuild_index(&ctx, &store, json)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
