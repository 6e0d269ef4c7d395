//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the identity API key, the store project id, optional
//! endpoint overrides, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/todolist/config.json`. Environment
//! variables take precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_AUTH_BASE_URL, DEFAULT_STORE_BASE_URL};
use crate::api::Endpoints;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "todolist";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_KEY: &str = "TODOLIST_API_KEY";
pub const ENV_PROJECT_ID: &str = "TODOLIST_PROJECT_ID";
pub const ENV_AUTH_URL: &str = "TODOLIST_AUTH_URL";
pub const ENV_STORE_URL: &str = "TODOLIST_STORE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub auth_base_url: Option<String>,
    pub store_base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from the environment. `lookup` returns a variable's value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = non_empty(ENV_PROJECT_ID) {
            self.project_id = Some(v);
        }
        if let Some(v) = non_empty(ENV_AUTH_URL) {
            self.auth_base_url = Some(v);
        }
        if let Some(v) = non_empty(ENV_STORE_URL) {
            self.store_base_url = Some(v);
        }
    }

    /// Resolve endpoints. The API key and project id are required.
    pub fn endpoints(&self) -> Result<Endpoints> {
        let api_key = self.api_key.clone().with_context(|| {
            format!("No API key configured (set {} or api_key in config.json)", ENV_API_KEY)
        })?;
        let project_id = self.project_id.clone().with_context(|| {
            format!(
                "No project id configured (set {} or project_id in config.json)",
                ENV_PROJECT_ID
            )
        })?;

        Ok(Endpoints {
            auth_base_url: self
                .auth_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_BASE_URL.to_string()),
            store_base_url: self
                .store_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_STORE_BASE_URL.to_string()),
            api_key,
            project_id,
        })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session file and logs
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
