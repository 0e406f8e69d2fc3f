//! Configuration manager for loading, saving, and managing simulation configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::SimConfig;

/// Shared configuration manager type
pub type SharedConfig = Arc<RwLock<ConfigManager>>;

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Configuration manager handles loading, saving, and accessing the configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: SimConfig,
    config_path: Option<PathBuf>,
    dirty: bool,
}

impl ConfigManager {
    /// In-memory manager with default values and no backing file
    pub fn new() -> Self {
        Self {
            config: SimConfig::new(),
            config_path: None,
            dirty: false,
        }
    }

    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: SimConfig =
            ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        tracing::info!("Loaded config from {:?}", path);

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
            dirty: false,
        })
    }

    /// Load configuration from a file, falling back to defaults
    ///
    /// A missing or unreadable file is not an error; the defaults are used and
    /// the path is remembered for a later [`save`](Self::save).
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(manager) => manager,
            Err(e) => {
                tracing::info!("No usable config at {:?} ({}), using defaults", path, e);
                Self {
                    config: SimConfig::new(),
                    config_path: Some(path.to_path_buf()),
                    dirty: false,
                }
            }
        }
    }

    /// Get a reference to the current configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration (marks as dirty)
    pub fn config_mut(&mut self) -> &mut SimConfig {
        self.dirty = true;
        &mut self.config
    }

    /// Check if the configuration has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save the configuration to its backing file
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = self.config_path.clone() else {
            return Err(ConfigError::Io("no config file path set".into()));
        };
        self.save_to(&path)
    }

    /// Save the configuration to the given file and make it the backing file
    pub fn save_to(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Ensure config directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = ron::ser::to_string_pretty(&self.config, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, &content).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::info!("Saved config to {:?}", path);
        self.config_path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset_to_defaults(&mut self) {
        self.config = SimConfig::new();
        self.dirty = true;
    }

    /// Get the config file path, if one is set
    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a new shared configuration manager
pub fn create_shared_config(manager: ConfigManager) -> SharedConfig {
    Arc::new(RwLock::new(manager))
}
