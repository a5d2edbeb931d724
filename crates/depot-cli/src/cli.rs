use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Blob storage with soft deletes, compaction and restore-from-blob",
    arg_required_else_help = true
)]
pub struct Args {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print logs and reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an annotated default config file
    #[clap(name = "defconfig")]
    DefConfig,

    /// Manage blob stores
    #[command(subcommand)]
    Store(StoreCommand),

    /// Store a file as a new blob
    Put {
        /// File to store, `-` for stdin
        file: String,

        /// Repository the blob belongs to
        #[arg(required = true, short, long)]
        repository: String,

        /// Asset path within the repository
        #[arg(required = true, short, long)]
        path: String,

        /// Content type recorded in the blob headers
        #[arg(long)]
        content_type: Option<String>,

        /// Blob store, defaults to the repository's store
        #[arg(short, long)]
        store: Option<String>,
    },

    /// Write the content of a live blob
    Get {
        blob_id: String,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long, default_value = "default")]
        store: String,
    },

    /// Soft-delete a blob
    #[clap(name = "delete", visible_alias = "rm")]
    Delete {
        #[arg(required = true)]
        blob_ids: Vec<String>,

        #[arg(short, long, default_value = "deleted from cli")]
        reason: String,

        #[arg(short, long, default_value = "default")]
        store: String,
    },

    /// Make soft-deleted blobs live again
    Undelete {
        #[arg(required = true)]
        blob_ids: Vec<String>,

        #[arg(short, long, default_value = "default")]
        store: String,
    },

    /// Inspect the soft-deleted blob ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),

    /// Hard-delete soft-deleted blobs
    Compact {
        #[arg(default_value = "default")]
        store: String,

        /// Only process the oldest records
        #[arg(long)]
        oldest: bool,
    },

    /// Recreate assets and components from blobs
    Restore {
        #[arg(default_value = "default")]
        store: String,

        /// Report what would be restored without writing
        #[arg(long)]
        dry_run: bool,

        /// Undelete soft-deleted blobs still referenced by an asset
        #[arg(long)]
        undelete: bool,
    },

    /// List assets recorded in the content database
    Assets {
        /// Only assets of this repository
        #[arg(short, long)]
        repository: Option<String>,

        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Recompute blob count and size from disk
    Reconcile {
        #[arg(default_value = "default")]
        store: String,
    },

    /// Re-hash live blobs and report content that changed on disk
    Verify {
        #[arg(default_value = "default")]
        store: String,
    },

    /// Add missing ledger records for soft-deleted blobs
    #[clap(name = "rebuild-index")]
    RebuildIndex {
        #[arg(default_value = "default")]
        store: String,
    },
}

#[derive(Subcommand)]
pub enum StoreCommand {
    /// List configured stores with their metrics
    #[clap(name = "list", visible_alias = "ls")]
    List,

    /// Create a store, adding it to the config when missing
    Create {
        name: String,

        /// Directory for the store content
        #[arg(long)]
        path: Option<String>,
    },

    /// Remove a store's data and drop it from the config
    #[clap(name = "remove", visible_alias = "rm")]
    Remove {
        name: String,

        /// Remove even when repositories still use the store
        #[arg(long)]
        force: bool,
    },

    /// Show the metrics of one store
    Metrics { name: String },

    /// Zero metrics of a store
    #[clap(name = "reset-metrics")]
    ResetMetrics {
        name: String,

        #[arg(long, value_enum, default_value_t = ResetTarget::Operations)]
        target: ResetTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ResetTarget {
    Operations,
    Counts,
    All,
}

#[derive(Subcommand)]
pub enum LedgerCommand {
    /// List soft-deleted blob records page by page
    #[clap(name = "list", visible_alias = "ls")]
    List {
        #[arg(default_value = "default")]
        store: String,

        /// Continuation token from a previous page
        #[arg(long)]
        token: Option<String>,

        #[arg(short, long, default_value_t = 100)]
        limit: usize,
    },

    /// Count soft-deleted blobs
    Count {
        #[arg(default_value = "default")]
        store: String,
    },

    /// Show the oldest soft-deleted blobs
    Oldest {
        #[arg(default_value = "default")]
        store: String,
    },
}
