use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EventError, Result};

pub const DEFAULT_ROW_CACHE_BYTES: usize = 8 * 1024 * 1024;
/// Smaller caches hold too few blocks to be worth the lookup overhead.
pub const MIN_ROW_CACHE_BYTES: usize = 64 * 1024;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DIR: &str = ".eventspan";
const COLLECTION_DIR: &str = "events";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// Size of the rocksdb row cache backing point lookups and scans.
    pub row_cache_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            data_dir: default_data_dir(),
            row_cache_bytes: DEFAULT_ROW_CACHE_BYTES,
            created_at: now,
            updated_at: now,
        }
    }
}

impl StoreConfig {
    /// Load the configuration at `path`, persisting and returning defaults
    /// when no file exists there yet. Loaded values are validated before
    /// they reach the store.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Self = toml::from_str(&contents)?;
                config.validate()?;
                Ok(config)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.persist(path)?;
                Ok(config)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(EventError::Config("data_dir must not be empty".into()));
        }
        if self.row_cache_bytes < MIN_ROW_CACHE_BYTES {
            return Err(EventError::Config(format!(
                "row_cache_bytes must be at least {MIN_ROW_CACHE_BYTES}, got {}",
                self.row_cache_bytes
            )));
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = dir;
        self.touch()
    }

    pub fn with_row_cache_bytes(mut self, bytes: usize) -> Self {
        self.row_cache_bytes = bytes;
        self.touch()
    }

    fn touch(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }

    /// Create the data directory if needed and return the collection path
    /// inside it.
    pub fn prepare(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(self.collection_path())
    }

    pub fn collection_path(&self) -> PathBuf {
        self.data_dir.join(COLLECTION_DIR)
    }
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join(CONFIG_FILE)
}

fn default_data_dir() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join(DEFAULT_DIR))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_init_persists_defaults_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        let config = StoreConfig::load_or_init(&config_path).unwrap();
        assert!(config_path.exists());
        assert_eq!(config.row_cache_bytes, DEFAULT_ROW_CACHE_BYTES);

        let config = config
            .with_data_dir(dir.path().join("data"))
            .with_row_cache_bytes(MIN_ROW_CACHE_BYTES);
        config.persist(&config_path).unwrap();

        let reloaded = StoreConfig::load_or_init(&config_path).unwrap();
        assert_eq!(reloaded.row_cache_bytes, MIN_ROW_CACHE_BYTES);
        assert_eq!(reloaded.data_dir, dir.path().join("data"));
        assert!(reloaded.updated_at >= reloaded.created_at);
    }

    #[test]
    fn load_rejects_undersized_row_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        StoreConfig::default()
            .with_row_cache_bytes(MIN_ROW_CACHE_BYTES - 1)
            .persist(&config_path)
            .unwrap();

        let err = StoreConfig::load_or_init(&config_path).unwrap_err();
        assert!(matches!(err, EventError::Config(_)));
    }

    #[test]
    fn prepare_creates_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::default().with_data_dir(dir.path().join("data"));

        let collection = config.prepare().unwrap();
        assert!(dir.path().join("data").is_dir());
        assert_eq!(collection, dir.path().join("data").join("events"));
    }
}
