//! JSON Configuration Management
//!
//! Handles reading and writing the pipeline configuration file.

use std::fs;
use std::path::PathBuf;

use crate::models::settings::PipelineSettings;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_atelier_dir};

/// Configuration service for managing pipeline settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    settings: PipelineSettings,
}

impl ConfigService {
    /// Create a new config service, loading existing config or creating defaults
    pub fn new() -> AppResult<Self> {
        ensure_atelier_dir()?;

        let config_path = config_path()?;
        let settings = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let defaults = PipelineSettings::default();
            Self::save_to_file(&config_path, &defaults)?;
            defaults
        };

        Ok(Self {
            config_path,
            settings,
        })
    }

    /// Create a config service bound to an explicit file (for testing).
    pub fn with_path(config_path: PathBuf) -> AppResult<Self> {
        let settings = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            PipelineSettings::default()
        };
        Ok(Self {
            config_path,
            settings,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &PathBuf) -> AppResult<PipelineSettings> {
        let content = fs::read_to_string(path)?;
        let settings: PipelineSettings = serde_json::from_str(&content)?;
        settings.validate().map_err(AppError::validation)?;
        Ok(settings)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &PathBuf, settings: &PipelineSettings) -> AppResult<()> {
        settings.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Current settings.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Replace and persist the settings.
    pub fn update(&mut self, settings: PipelineSettings) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &settings)?;
        self.settings = settings;
        Ok(())
    }
}
