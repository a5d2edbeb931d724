pub mod context;
pub mod types;

pub mod blob;
pub mod compact;
pub mod reconcile;
pub mod restore;
pub mod store;

pub use context::DepotContext;
pub use tokio_util::sync::CancellationToken;
pub use types::*;
