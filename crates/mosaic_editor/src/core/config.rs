//! Persistent key/value configuration and editor tunables.
//!
//! Settings survive editor restarts: the key/value store is written through
//! to a TOML file under the user's config directory on every change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mosaic_scene::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Key/value configuration store.
#[derive(Clone, Debug)]
pub struct Config {
    path: Option<PathBuf>,
    values: toml::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Config {
    pub const DEFAULT_NAME: &'static str = "editor";

    pub const LANGUAGE: &'static str = "language";
    pub const AUTOSAVE: &'static str = "autosave";
    pub const HISTORY: &'static str = "settings/history";
    pub const SELECTED: &'static str = "selected";

    fn defaults() -> toml::Table {
        let mut values = toml::Table::new();
        values.insert(Self::LANGUAGE.into(), toml::Value::from("en"));
        values.insert(Self::AUTOSAVE.into(), toml::Value::from(true));
        values.insert(Self::HISTORY.into(), toml::Value::from(false));
        values.insert(Self::SELECTED.into(), toml::Value::Array(Vec::new()));
        values
    }

    /// Config that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Self::defaults(),
        }
    }

    /// Open a file-backed config. Stored keys override the defaults; a
    /// missing file is created with the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut values = Self::defaults();
        let existed = path.exists();

        if existed {
            let content = std::fs::read_to_string(&path)?;
            let stored: toml::Table = toml::from_str(&content)?;
            for (key, value) in stored {
                values.insert(key, value);
            }
            log::info!("Loaded config from {:?}", path);
        }

        let config = Self {
            path: Some(path),
            values,
        };
        if !existed {
            config.save()?;
        }
        Ok(config)
    }

    /// Get the default path for a named config.
    pub fn default_path(name: &str) -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("mosaic");
            p.push(format!("{}.toml", name));
            p
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_key(&self, key: &str) -> Option<&toml::Value> {
        self.values.get(key)
    }

    /// Set a key and write the store through to disk when file-backed.
    pub fn set_key(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.values.insert(key.to_string(), value.into());

        if self.path.is_some() {
            match self.save() {
                Ok(()) => log::debug!("Saved config key '{}'", key),
                Err(e) => log::warn!("Failed to persist config key '{}': {}", key, e),
            }
        }
    }

    /// Write the store to its backing file. No-op for in-memory configs.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string(&self.values)?)?;
        Ok(())
    }

    /// Delete the backing file.
    pub fn dispose(self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn flag(&self, key: &str) -> bool {
        self.get_key(key).and_then(toml::Value::as_bool).unwrap_or(false)
    }

    /// Whether executed commands are serialized for history persistence.
    pub fn history_enabled(&self) -> bool {
        self.flag(Self::HISTORY)
    }

    pub fn autosave(&self) -> bool {
        self.flag(Self::AUTOSAVE)
    }

    pub fn language(&self) -> &str {
        self.get_key(Self::LANGUAGE)
            .and_then(toml::Value::as_str)
            .unwrap_or("en")
    }

    /// Persisted selection. Entries that do not parse are skipped.
    pub fn selected(&self) -> Vec<NodeId> {
        self.get_key(Self::SELECTED)
            .and_then(toml::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(toml::Value::as_str)
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_selected(&mut self, ids: &[NodeId]) {
        let items: Vec<toml::Value> = ids
            .iter()
            .map(|id| toml::Value::String(id.to_string()))
            .collect();
        self.set_key(Self::SELECTED, toml::Value::Array(items));
    }
}

/// Editor tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Window within which consecutive updatable commands on the same
    /// target merge into one history entry
    pub time_difference_limit_ms: u64,
    /// Maximum retained diagnostics entries
    pub diagnostics_capacity: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            time_difference_limit_ms: 500,
            diagnostics_capacity: 1000,
        }
    }
}

impl EditorSettings {
    pub fn time_difference_limit(&self) -> Duration {
        Duration::from_millis(self.time_difference_limit_ms)
    }

    /// Load settings from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        log::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        log::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Get the default settings path.
    pub fn default_path() -> Option<PathBuf> {
        Config::default_path("settings")
    }
}
