//! JSON Configuration Management
//!
//! Reads and writes the runtime configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::{RuntimeConfig, RuntimeConfigUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for the runtime settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: RuntimeConfig,
}

impl ConfigService {
    /// Load ~/.agent-runtime/config.json, creating it with defaults if missing
    pub fn new() -> AppResult<Self> {
        Self::from_path(config_path()?)
    }

    /// Load the configuration at `path`, creating it with defaults if missing
    pub fn from_path(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            ensure_dir(parent)?;
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = RuntimeConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<RuntimeConfig> {
        let content = fs::read_to_string(path)?;
        let config: RuntimeConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &RuntimeConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply a partial update and persist it. The in-memory config is left
    /// untouched if the result does not validate.
    pub fn update_config(&mut self, update: RuntimeConfigUpdate) -> AppResult<RuntimeConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        Self::save_to_file(&self.config_path, &next)?;
        self.config = next;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = RuntimeConfig::default();
        self.save()
    }
}
