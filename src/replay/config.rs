// config.rs - replay log configuration
// Copyright (C) 2018  David Stainton.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, StorageError};

/// The default directory where the decayed log keeps its
/// (fingerprint, expiry height) pairs.
pub const DEFAULT_DB_DIRECTORY: &str = "sharedsecret";

pub const DEFAULT_DB_FILE: &str = "decayedlog.db";

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the database, created on open.
    pub data_dir: PathBuf,

    pub db_file: String,

    /// How long a writer waits on a locked database before failing.
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DB_DIRECTORY),
            db_file: DEFAULT_DB_FILE.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Config {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, LogError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&raw)
    }
}
