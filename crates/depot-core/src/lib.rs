use chrono::{SecondsFormat, Utc};

pub mod blob;
pub mod database;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod restore;

pub type DepotResult<T> = std::result::Result<T, error::DepotError>;

/// Current time as fixed-width RFC 3339 so that stored timestamps sort as text.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
