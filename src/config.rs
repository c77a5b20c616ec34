//! Chadwick Binding Configuration
//!
//! Handles parsing and management of chadwick.toml configuration files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ffi::{library_filename, LibraryLoader};
use crate::frame::{event_data_types, ColumnType, TypeMapping};

/// File name searched for by [`ChadwickConfig::find_and_load`].
pub const CONFIG_FILE: &str = "chadwick.toml";

/// Environment variable overriding `library.path`.
pub const LIBRARY_ENV: &str = "CHADWICK_LIB";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching chadwick.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChadwickConfig {
    /// Where to find libchadwick
    #[serde(default)]
    pub library: LibraryConfig,

    /// Which output fields are enabled
    #[serde(default)]
    pub fields: FieldsConfig,

    /// Column type overrides applied on top of the standard mapping
    #[serde(default, serialize_with = "serialize_types")]
    pub types: BTreeMap<String, ColumnType>,
}

impl ChadwickConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ChadwickConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        match Self::find(start_dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Path of the nearest chadwick.toml at or above `start_dir`
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Library name or path: `CHADWICK_LIB`, then `library.path`, then the
    /// platform's `libchadwick` file name.
    pub fn library_name(&self) -> String {
        std::env::var(LIBRARY_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.library.path.clone())
            .unwrap_or_else(|| library_filename("chadwick"))
    }

    /// Loader searching the configured directories before the defaults.
    pub fn loader(&self) -> LibraryLoader {
        let mut loader = LibraryLoader::new();
        for path in self.library.search_paths.iter().rev() {
            loader.prepend_search_path(path);
        }
        loader
    }

    /// Resolve [`library_name`](Self::library_name) against the search
    /// paths; an unresolved name is left for the platform loader.
    pub fn resolve_library(&self) -> PathBuf {
        self.resolve(&self.library_name())
    }

    /// Resolve a library path, file name or short name (`chadwick`)
    /// against the search paths; an unresolved name is returned unchanged.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.loader()
            .find_library(name)
            .unwrap_or_else(|| PathBuf::from(name))
    }

    /// Standard column types with this config's overrides applied.
    pub fn type_mapping(&self) -> TypeMapping {
        let mut mapping = event_data_types();
        for (name, ty) in &self.types {
            match mapping.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = *ty,
                None => mapping.push((name.clone(), *ty)),
            }
        }
        mapping
    }
}

/// Library location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Path or file name of the shared library
    #[serde(default)]
    pub path: Option<String>,

    /// Extra directories searched before the system defaults
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

/// Field selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Headers to enable; empty enables every field
    #[serde(default)]
    pub enabled: Vec<String>,
}

fn serialize_types<S: serde::Serializer>(
    types: &BTreeMap<String, ColumnType>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(types.len()))?;
    for (name, ty) in types {
        map.serialize_entry(name, &ty.to_string())?;
    }
    map.end()
}
