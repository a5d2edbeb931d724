use depot_utils::error::{FileSystemError, PathError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(depot_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(depot_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {0}")]
    #[diagnostic(
        code(depot_config::already_exists),
        help("Remove the existing config file or pass a different location with --config")
    )]
    ConfigAlreadyExists(String),

    #[error("Invalid name '{0}'")]
    #[diagnostic(
        code(depot_config::invalid_name),
        help("Names may only contain ASCII letters, digits, '.', '_' and '-'")
    )]
    InvalidName(String),

    #[error("Duplicate blob store name: {0}")]
    #[diagnostic(
        code(depot_config::duplicate_blob_store),
        help("Each blob store must have a unique name")
    )]
    DuplicateBlobStoreName(String),

    #[error("Duplicate repository name: {0}")]
    #[diagnostic(
        code(depot_config::duplicate_repo),
        help("Each repository must have a unique name")
    )]
    DuplicateRepositoryName(String),

    #[error("Repository '{repository}' references unknown blob store '{blob_store}'")]
    #[diagnostic(
        code(depot_config::unknown_blob_store),
        help("Add a [[blob_stores]] entry named '{blob_store}' or fix the reference")
    )]
    UnknownBlobStore {
        repository: String,
        blob_store: String,
    },

    #[error("Repository '{repository}' has unsupported format '{format}'")]
    #[diagnostic(
        code(depot_config::unknown_format),
        help("Supported formats: raw, maven2, npm, apt")
    )]
    UnknownFormat { repository: String, format: String },

    #[error("Invalid duration for {field}: '{value}'")]
    #[diagnostic(
        code(depot_config::invalid_duration),
        help("Use a number followed by s, m, h or d, e.g. \"12h\"")
    )]
    InvalidDuration { field: &'static str, value: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(depot_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(depot_config::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(depot_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(depot_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),

    #[error("Failed to annotate first table in array: {0}")]
    #[diagnostic(code(depot_config::annotate_first_table))]
    AnnotateFirstTable(String),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<FileSystemError> for ConfigError {
    fn from(err: FileSystemError) -> Self {
        Self::Utils(UtilsError::FileSystem(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
