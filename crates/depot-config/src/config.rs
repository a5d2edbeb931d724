use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use depot_utils::{
    path::{resolve_path, xdg_config_home, xdg_data_home},
    time::parse_duration,
};
use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::{annotate_toml_array_of_tables, annotate_toml_table},
    blob_store::BlobStoreConfig,
    error::{ConfigError, Result},
    repository::{RepositoryConfig, SUPPORTED_FORMATS},
    utils::{default_packaging_extensions, is_valid_name},
};

/// depot configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Root directory for all depot data.
    /// Default: $XDG_DATA_HOME/depot
    pub root_path: String,

    /// Directory holding the blob and content databases.
    /// Default: $DEPOT_ROOT/db
    pub db_path: Option<String>,

    /// Directory holding per-store lock files.
    /// Default: $DEPOT_ROOT/locks
    pub lock_path: Option<String>,

    /// Only blobs soft-deleted at least this long ago are removed by compaction
    /// (e.g., "0s", "12h", "7d").
    /// Default: "0s"
    pub compaction_min_age: Option<String>,

    /// Maps Maven packaging types to the file extension of their main artifact.
    /// Packagings not listed here use the packaging name as extension.
    pub maven_packaging_extensions: Option<HashMap<String, String>>,

    /// Configured blob stores.
    pub blob_stores: Vec<BlobStoreConfig>,

    /// Configured repositories.
    pub repositories: Vec<RepositoryConfig>,
}

/// Location of the configuration file: `$DEPOT_CONFIG` or `$XDG_CONFIG_HOME/depot/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("DEPOT_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("depot").join("config.toml"),
    }
}

impl Config {
    pub fn default_config() -> Self {
        let depot_root = std::env::var("DEPOT_ROOT")
            .unwrap_or_else(|_| format!("{}/depot", xdg_data_home().display()));

        Self {
            db_path: Some(format!("{depot_root}/db")),
            lock_path: Some(format!("{depot_root}/locks")),
            root_path: depot_root,
            compaction_min_age: Some("0s".to_string()),
            maven_packaging_extensions: Some(default_packaging_extensions()),
            blob_stores: vec![BlobStoreConfig {
                name: "default".to_string(),
                path: None,
            }],
            repositories: vec![RepositoryConfig {
                name: "raw-hosted".to_string(),
                format: "raw".to_string(),
                blob_store: "default".to_string(),
                restorable: Some(true),
            }],
        }
    }

    /// Loads and resolves the configuration at `path`, falling back to defaults when
    /// the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn resolve(&mut self) -> Result<()> {
        self.compaction_min_age.get_or_insert_with(|| "0s".to_string());
        self.maven_packaging_extensions
            .get_or_insert_with(default_packaging_extensions);

        if let Some(value) = &self.compaction_min_age {
            if parse_duration(value).is_none() {
                return Err(ConfigError::InvalidDuration {
                    field: "compaction_min_age",
                    value: value.clone(),
                });
            }
        }

        let mut seen_stores = HashSet::new();
        for store in &self.blob_stores {
            if !is_valid_name(&store.name) {
                return Err(ConfigError::InvalidName(store.name.clone()));
            }
            if !seen_stores.insert(store.name.as_str()) {
                return Err(ConfigError::DuplicateBlobStoreName(store.name.clone()));
            }
        }

        let mut seen_repos = HashSet::new();
        for repo in &mut self.repositories {
            if !is_valid_name(&repo.name) {
                return Err(ConfigError::InvalidName(repo.name.clone()));
            }
            if !seen_repos.insert(repo.name.clone()) {
                return Err(ConfigError::DuplicateRepositoryName(repo.name.clone()));
            }
            if !seen_stores.contains(repo.blob_store.as_str()) {
                return Err(ConfigError::UnknownBlobStore {
                    repository: repo.name.clone(),
                    blob_store: repo.blob_store.clone(),
                });
            }
            if !SUPPORTED_FORMATS.contains(&repo.format.as_str()) {
                return Err(ConfigError::UnknownFormat {
                    repository: repo.name.clone(),
                    format: repo.format.clone(),
                });
            }

            repo.restorable.get_or_insert(true);
        }

        Ok(())
    }

    pub fn get_root_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("DEPOT_ROOT") {
            return Ok(resolve_path(&env_path)?);
        }
        Ok(resolve_path(&self.root_path)?)
    }

    pub fn get_db_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("DEPOT_DB") {
            return Ok(resolve_path(&env_path)?);
        }
        if let Some(db_path) = &self.db_path {
            return Ok(resolve_path(db_path)?);
        }
        Ok(self.get_root_path()?.join("db"))
    }

    pub fn get_lock_path(&self) -> Result<PathBuf> {
        if let Some(lock_path) = &self.lock_path {
            return Ok(resolve_path(lock_path)?);
        }
        Ok(self.get_root_path()?.join("locks"))
    }

    pub fn get_blob_store(&self, name: &str) -> Option<&BlobStoreConfig> {
        self.blob_stores.iter().find(|store| store.name == name)
    }

    /// Content directory of the named store, `None` when the store is not configured.
    pub fn get_blob_store_path(&self, name: &str) -> Result<Option<PathBuf>> {
        let Some(store) = self.get_blob_store(name) else {
            return Ok(None);
        };
        let path = match &store.path {
            Some(path) => resolve_path(path)?,
            None => self.get_root_path()?.join("blobs").join(&store.name),
        };
        Ok(Some(path))
    }

    pub fn get_repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|repo| repo.name == name)
    }

    /// Repositories whose content lives in `store`.
    pub fn repositories_in_store<'a>(
        &'a self,
        store: &'a str,
    ) -> impl Iterator<Item = &'a RepositoryConfig> + 'a {
        self.repositories
            .iter()
            .filter(move |repo| repo.blob_store == store)
    }

    /// Minimum soft-deletion age in milliseconds before compaction removes a blob.
    pub fn get_compaction_min_age(&self) -> u128 {
        self.compaction_min_age
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(0)
    }

    pub fn get_maven_packaging_extensions(&self) -> HashMap<String, String> {
        self.maven_packaging_extensions
            .clone()
            .unwrap_or_else(default_packaging_extensions)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_path, serialized)?;
        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(stores_item) = doc.get_mut("blob_stores") {
            if let Some(stores_array) = stores_item.as_array_of_tables_mut() {
                annotate_toml_array_of_tables::<BlobStoreConfig>(stores_array)?;
            }
        }

        if let Some(repositories_item) = doc.get_mut("repositories") {
            if let Some(repositories_array) = repositories_item.as_array_of_tables_mut() {
                annotate_toml_array_of_tables::<RepositoryConfig>(repositories_array)?;
            }
        }

        Ok(doc)
    }
}

/// Writes an annotated default configuration to `path`. Refuses to overwrite.
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config_path = path.as_ref();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(
            config_path.display().to_string(),
        ));
    }

    let def_config = Config::default_config();
    let annotated_doc = def_config.to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(())
}
