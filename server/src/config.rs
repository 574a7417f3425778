// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server configuration stored as TOML

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// URL the AI requests are POSTed to
    pub endpoint: String,
    #[serde(default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,
    /// Cap on re-requests after the AI picks an occupied point. Unset means
    /// keep asking.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub ai: AiConfig,
    #[serde(default = "default_board_size")]
    pub default_board_size: u8,
    #[serde(default = "default_allowed_board_sizes")]
    pub allowed_board_sizes: Vec<u8>,
    #[serde(default = "default_komi")]
    pub komi: f32,
    /// Directory for the JSON match store; in-memory when unset
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

fn default_ai_timeout_ms() -> u64 {
    10_000
}

fn default_board_size() -> u8 {
    9
}

fn default_allowed_board_sizes() -> Vec<u8> {
    vec![9, 13, 19]
}

fn default_komi() -> f32 {
    goroom_core::KOMI
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:30000/ai/attackEnemy".to_string(),
            timeout_ms: default_ai_timeout_ms(),
            max_retries: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ai: AiConfig::default(),
            default_board_size: default_board_size(),
            allowed_board_sizes: default_allowed_board_sizes(),
            komi: default_komi(),
            store_dir: None,
        }
    }
}

impl ServerConfig {
    /// Resolve a requested size; 0 selects the default
    pub fn board_size(&self, requested: u8) -> Option<u8> {
        let size = if requested == 0 {
            self.default_board_size
        } else {
            requested
        };
        self.allowed_board_sizes.contains(&size).then_some(size)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "goroom", "goroom")
        .context("Failed to determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load the config from the platform config directory, writing defaults
/// on first run
pub fn load_config() -> Result<ServerConfig> {
    let config_path = get_config_path().context("Failed to determine config path")?;
    load_config_from(&config_path)
}

pub fn load_config_from(config_path: &Path) -> Result<ServerConfig> {
    if !config_path.exists() {
        tracing::info!("Config file not found, creating default at: {}", config_path.display());

        let default_config = ServerConfig::default();
        save_config_to(&default_config, config_path)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    toml::from_str::<ServerConfig>(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

pub fn save_config_to(config: &ServerConfig, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let toml_content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(config_path, toml_content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    tracing::info!("Saved config to: {}", config_path.display());
    Ok(())
}
