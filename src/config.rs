//! Application configuration module
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lang::Language;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Bundled seed data
    #[serde(default)]
    pub seed: SeedConfig,
    /// Language used when no preference has been stored
    #[serde(default)]
    pub default_language: Language,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path
    pub data_dir: String,
    /// Cache database file path (relative to data_dir)
    pub db_file: String,
    /// How long a statement waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Seed data configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    /// JSON fixture imported on first launch; empty disables seeding
    pub path: String,
    /// Clear the catalog and import again on every start
    #[serde(default)]
    pub force_reset: bool,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            seed: SeedConfig {
                path: "data/taxes.json".to_string(),
                force_reset: false,
            },
            default_language: Language::DEFAULT,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "taxasge.db".to_string(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Full database URL; `DATABASE_URL` in the environment wins
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.file_database_url())
    }

    /// Database URL derived from the config file alone
    pub fn file_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Seed file to import, if seeding is enabled
    pub fn seed_path(&self) -> Option<PathBuf> {
        if self.seed.path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.seed.path))
        }
    }
}

/// Get the config file path
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load config.json from the working directory, creating it with defaults if missing
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&get_config_path())
}

/// Load configuration from `path`, or create the default there if it does not exist
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        write_config(&config, path)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }
}

fn write_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content =
        serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}
