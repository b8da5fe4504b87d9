//! KlassBot configuration loader.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "klassbot.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: default_catalog_base_url(),
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub application_id: String,
    /// When set, slash commands register against this guild only (instant
    /// propagation; global commands can take up to an hour).
    #[serde(default)]
    pub guild_id: Option<String>,
}

fn default_catalog_base_url() -> String {
    kb_catalog::DEFAULT_BASE_URL.to_string()
}

fn default_database_path() -> String {
    "user_preferences.db".to_string()
}

/// Load the config file and apply env overrides for secrets.
pub fn load(path: &Path) -> Result<BotConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    let mut cfg: BotConfig =
        toml::from_str(&raw).with_context(|| format!("parse config file: {}", path.display()))?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut BotConfig) {
    if let Ok(token) = std::env::var("KLASSBOT_DISCORD_TOKEN") {
        if !token.trim().is_empty() {
            cfg.discord.bot_token = token;
        }
    }
    if let Ok(application_id) = std::env::var("KLASSBOT_APPLICATION_ID") {
        if !application_id.trim().is_empty() {
            cfg.discord.application_id = application_id;
        }
    }
    if let Ok(base_url) = std::env::var("KLASSBOT_CATALOG_BASE_URL") {
        if !base_url.trim().is_empty() {
            cfg.general.catalog_base_url = base_url;
        }
    }
}

/// Checks the fields `serve` cannot run without.
pub fn validate(cfg: &BotConfig) -> Result<()> {
    if cfg.discord.bot_token.trim().is_empty() {
        anyhow::bail!(
            "discord.bot_token is empty; set it in the config file or KLASSBOT_DISCORD_TOKEN"
        );
    }
    if cfg.discord.application_id.trim().is_empty() {
        anyhow::bail!(
            "discord.application_id is empty; set it in the config file or KLASSBOT_APPLICATION_ID"
        );
    }
    Ok(())
}
