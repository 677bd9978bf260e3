mod access;
mod album;
mod attribution;
mod bot;
mod caption;
mod config;
mod error;
mod platform;
mod relay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;
use crate::platform::telegram::{self, TelegramTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,channel_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Channel: {}", config.telegram.channel_id);
    info!("  Allowed chats: {:?}", config.telegram.allowed_user_ids);
    info!(
        "  Album window: {:?} (max {:?})",
        config.relay.album_window(),
        config.relay.album_max_wait()
    );
    if config.telegram.allowed_user_ids.is_empty() {
        warn!("No allowed chats configured, every message will be refused");
    }

    let bot = teloxide::Bot::new(&config.telegram.bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let state = Arc::new(AppState::new(&config, transport));

    info!("Relay is starting...");
    telegram::run(bot, state).await?;

    Ok(())
}
