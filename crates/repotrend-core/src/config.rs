use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paging::PagingConfig;

/// Main configuration structure
///
/// Loaded from the config file, then overridden by env vars and CLI args.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub paging: PagingSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub trending: TrendingConfig,
}

impl Config {
    /// Load config from default location, defaults if there is no file
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> crate::Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> crate::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)?;
        Ok(())
    }

    /// `<config_dir>/repotrend/config.toml`
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("repotrend");

        Ok(config_dir.join("config.toml"))
    }

    /// Database path from the config, or `<data_dir>/repotrend/repotrend.db`
    pub fn database_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.storage.database_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("repotrend");

        Ok(data_dir.join("repotrend.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubConfig {
    /// GitHub personal access token, raises the search rate limit
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagingSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// How close to the end of the loaded list a reader gets before the next page is fetched
    #[serde(default = "default_prefetch_distance")]
    pub prefetch_distance: usize,
}

fn default_page_size() -> u32 {
    30
}

fn default_prefetch_distance() -> usize {
    3
}

impl Default for PagingSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            prefetch_distance: default_prefetch_distance(),
        }
    }
}

impl From<&PagingSettings> for PagingConfig {
    fn from(settings: &PagingSettings) -> Self {
        PagingConfig {
            page_size: settings.page_size.max(1),
            prefetch_distance: settings.prefetch_distance,
            ..PagingConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

/// Where trending pages come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendingMode {
    /// Search endpoint restricted by creation date
    #[default]
    Search,
    /// Dedicated trending listing endpoint
    Listing,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TrendingConfig {
    #[serde(default)]
    pub mode: TrendingMode,
}
