use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::caption::MAX_CAPTION_LEN;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chats allowed to submit posts
    pub allowed_user_ids: Vec<i64>,
    /// Destination channel, e.g. -1001234567890
    pub channel_id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// HTML appended to every relayed caption and text, before the source line
    #[serde(default)]
    pub caption_suffix: String,
    #[serde(default = "default_source_label")]
    pub source_label: String,
    /// Shown when a forward's origin can't be resolved
    #[serde(default = "default_unknown_source")]
    pub unknown_source: String,
    #[serde(default = "default_max_caption_len")]
    pub max_caption_len: usize,
    /// Quiet period after the last album item before the album is posted
    #[serde(default = "default_album_window_ms")]
    pub album_window_ms: u64,
    /// Hard cap on how long one album may keep collecting
    #[serde(default = "default_album_max_wait_ms")]
    pub album_max_wait_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            caption_suffix: String::new(),
            source_label: default_source_label(),
            unknown_source: default_unknown_source(),
            max_caption_len: default_max_caption_len(),
            album_window_ms: default_album_window_ms(),
            album_max_wait_ms: default_album_max_wait_ms(),
        }
    }
}

impl RelayConfig {
    pub fn album_window(&self) -> Duration {
        Duration::from_millis(self.album_window_ms)
    }

    pub fn album_max_wait(&self) -> Duration {
        Duration::from_millis(self.album_max_wait_ms)
    }
}

fn default_source_label() -> String {
    "🐘 Источник:".to_string()
}

fn default_unknown_source() -> String {
    "наш слон".to_string()
}

fn default_max_caption_len() -> usize {
    MAX_CAPTION_LEN
}

fn default_album_window_ms() -> u64 {
    10
}

fn default_album_max_wait_ms() -> u64 {
    1000
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token must not be empty");
        }
        if self.relay.max_caption_len == 0 || self.relay.max_caption_len > MAX_CAPTION_LEN {
            bail!(
                "relay.max_caption_len must be between 1 and {}",
                MAX_CAPTION_LEN
            );
        }
        if self.relay.album_window_ms == 0 {
            bail!("relay.album_window_ms must be greater than zero");
        }
        Ok(())
    }
}
