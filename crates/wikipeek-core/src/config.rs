//! TOML configuration with per-field defaults.
//!
//! A missing config file is not an error: every section falls back to
//! defaults that point at the public Path of Exile wiki.


use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::WikipeekError;

/// Top-level wikipeek configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory for the request/error log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub discord: Option<DiscordConfig>,
}

/// Discord bot config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
}

/// Target wiki: lookup base URL plus the CSS selectors that drive
/// validity detection and extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Base URL; the resolved title (spaces as `_`) is appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors for the target wiki's page structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Present on the page only when the requested article does not exist.
    #[serde(default = "default_invalid_page")]
    pub invalid_page: String,
    /// Container holding the article's lead paragraphs.
    #[serde(default = "default_paragraphs")]
    pub paragraphs: String,
    /// Infobox container; its presence pushes the lead paragraph down by one.
    #[serde(default = "default_infobox")]
    pub infobox: String,
    /// Screenshot fallback chain, tried in this order.
    #[serde(default = "default_info_card")]
    pub info_card: String,
    #[serde(default = "default_item_box")]
    pub item_box: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            invalid_page: default_invalid_page(),
            paragraphs: default_paragraphs(),
            infobox: default_infobox(),
            info_card: default_info_card(),
            item_box: default_item_box(),
            table: default_table(),
        }
    }
}

/// Headless rendering session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Tall viewport so the target region isn't covered by popups.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Leaving scripting off roughly doubles render speed on the target
    /// wiki and avoids navigation hangs under the `load` wait.
    #[serde(default)]
    pub enable_javascript: bool,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    /// Explicit Chrome/Chromium binary. `None` = autodetect.
    #[serde(default)]
    pub chrome_executable: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            enable_javascript: false,
            navigation_timeout_secs: default_navigation_timeout(),
            chrome_executable: None,
        }
    }
}

/// Reply lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// How long a failure edit stays visible before the placeholder is
    /// fetched and deleted.
    #[serde(default = "default_delete_delay")]
    pub delete_delay_ms: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            delete_delay_ms: default_delete_delay(),
        }
    }
}

fn default_name() -> String {
    "wikipeek".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://www.poewiki.net/wiki/".to_string()
}

fn default_invalid_page() -> String {
    ".noarticletext".to_string()
}

fn default_paragraphs() -> String {
    "#mw-content-text > .mw-parser-output".to_string()
}

fn default_infobox() -> String {
    ".infobox-page-container".to_string()
}

fn default_info_card() -> String {
    ".infocard".to_string()
}

fn default_item_box() -> String {
    ".item-box".to_string()
}

fn default_table() -> String {
    "#mw-content-text table.wikitable".to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    3000
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_delete_delay() -> u64 {
    2000
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, WikipeekError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| WikipeekError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| WikipeekError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
