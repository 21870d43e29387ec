use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{NoiseError, Result};

/// Overrides the directory holding the database file.
pub const DATA_DIR_ENV: &str = "NOISELOG_DATA_DIR";
/// Selects the storage backend: `sqlite` or `memory`.
pub const BACKEND_ENV: &str = "NOISELOG_BACKEND";

const DEFAULT_DATABASE_FILE: &str = "noises.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Sqlite,
    /// Non-durable; contents are lost when the worker stops.
    Memory,
}

impl FromStr for Backend {
    type Err = NoiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => Err(NoiseError::validation(format!(
                "unknown storage backend '{other}' (expected 'sqlite' or 'memory')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoiseConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub backend: Backend,
}

impl NoiseConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            backend: Backend::Sqlite,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            ..Self::default()
        }
    }

    /// Defaults, with `NOISELOG_DATA_DIR` and `NOISELOG_BACKEND` applied on top.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(backend) = std::env::var(BACKEND_ENV) {
            config.backend = backend.parse()?;
        }
        Ok(config)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("noiselog"))
            .unwrap_or_else(|| PathBuf::from("noiselog_data"));
        Self::new(data_dir)
    }
}
