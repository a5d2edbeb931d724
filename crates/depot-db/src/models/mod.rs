pub mod content;
pub mod ledger;
pub mod metrics;
