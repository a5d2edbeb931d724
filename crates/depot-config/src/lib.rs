pub mod annotations;
pub mod blob_store;
pub mod config;
pub mod error;
pub mod repository;
pub mod utils;

#[cfg(test)]
pub mod test_utils;
