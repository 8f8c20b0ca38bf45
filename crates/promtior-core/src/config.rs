use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const BASE_URL_ENV: &str = "PROMTIOR_BASE_URL";
pub const LOG_LEVEL_ENV: &str = "APP_LOG_LEVEL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read a config file. A missing file is not an error and yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Base URL of the RAG service: environment first, then the config file.
    pub fn base_url(&self) -> String {
        self.base_url_with(std::env::var(BASE_URL_ENV).ok())
    }

    pub fn log_level(&self) -> String {
        self.log_level_with(std::env::var(LOG_LEVEL_ENV).ok())
    }

    fn base_url_with(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    fn log_level_with(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.log_level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("promtior-chat").join("config.json"))
    }
}
