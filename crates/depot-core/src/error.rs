//! Error types for depot-core.

use depot_config::error::ConfigError;
use depot_db::error::DbError;
use depot_utils::error::{FileSystemError, HashError, LockError, PathError};
use miette::Diagnostic;
use thiserror::Error;

/// Core error type for depot operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DepotError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(code(depot::fs), help("Check file permissions and disk space"))]
    FileSystemError(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(depot::hash))]
    HashError(#[from] HashError),

    #[error(transparent)]
    #[diagnostic(code(depot::path), help("Check the configured paths"))]
    PathError(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(code(depot::lock))]
    LockError(#[from] LockError),

    #[error("Error while {action}")]
    #[diagnostic(code(depot::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Blob store '{0}' is not configured")]
    #[diagnostic(
        code(depot::unknown_blob_store),
        help("Add a [[blob_stores]] entry to your config or run 'depot store list'")
    )]
    UnknownBlobStore(String),

    #[error("Repository '{0}' is not configured")]
    #[diagnostic(
        code(depot::unknown_repository),
        help("Add a [[repositories]] entry to your config")
    )]
    UnknownRepository(String),

    #[error("Blob '{blob_id}' not found in store '{store}'")]
    #[diagnostic(code(depot::blob_not_found))]
    BlobNotFound { store: String, blob_id: String },

    #[error("Invalid blob id '{0}'")]
    #[diagnostic(
        code(depot::invalid_blob_id),
        help("Blob ids look like '<uuid>@<YYYY-MM-DDTHH:MM>'")
    )]
    InvalidBlobId(String),

    #[error("Corrupt attributes for blob '{blob_id}': {reason}")]
    #[diagnostic(
        code(depot::blob_attributes),
        help("Run 'depot rebuild-index' after fixing or removing the attributes file")
    )]
    InvalidAttributes { blob_id: String, reason: String },

    #[error("Missing required blob header '{0}'")]
    #[diagnostic(code(depot::missing_header))]
    MissingHeader(&'static str),

    #[error("Invalid continuation token '{0}'")]
    #[diagnostic(code(depot::invalid_token))]
    InvalidToken(String),

    #[error("Blob store '{0}' is busy")]
    #[diagnostic(
        code(depot::store_busy),
        help("Another process is compacting this store; try again later")
    )]
    StoreBusy(String),

    #[error("Thread lock poison error")]
    #[diagnostic(
        code(depot::poison),
        help("This is an internal error, please report it")
    )]
    PoisonError,

    #[error("{0}")]
    #[diagnostic(code(depot::error))]
    Custom(String),
}

impl DepotError {
    /// True when the underlying database error is a unique-key violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::Database(err) if err.is_duplicate_key())
    }

    /// Convenience for content that parsed as the wrong shape.
    pub fn invalid_data(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IoError {
            action: action.into(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, reason.into()),
        }
    }
}

impl From<diesel::result::Error> for DepotError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

impl<T> From<std::sync::PoisonError<T>> for DepotError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::PoisonError
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DepotError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DepotError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            DepotError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
