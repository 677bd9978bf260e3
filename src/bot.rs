use std::sync::Arc;

use tracing::{debug, info};

use crate::access::{AccessGate, DENIED_REPLY};
use crate::album::{new_registry, AlbumAggregator, Offer};
use crate::attribution::AttributionResolver;
use crate::caption::CaptionPolicy;
use crate::config::Config;
use crate::error::Result;
use crate::platform::{InboundMessage, Transport};
use crate::relay::ContentRelay;

pub const GREETING: &str = "Hi, send me any messages, I will change them and post to the channel";

/// What happened to an inbound message.
#[derive(Debug)]
pub enum Routed {
    Denied,
    Greeted,
    /// Held for album aggregation.
    Buffered(Offer),
    Relayed,
    Skipped,
}

/// Shared application state
pub struct AppState {
    gate: AccessGate,
    relay: Arc<ContentRelay>,
    albums: AlbumAggregator,
    transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let relay = Arc::new(ContentRelay::new(
            transport.clone(),
            config.telegram.channel_id,
            AttributionResolver::new(
                config.relay.source_label.clone(),
                config.relay.unknown_source.clone(),
            ),
            CaptionPolicy::new(config.relay.max_caption_len),
            config.relay.caption_suffix.clone(),
        ));
        let albums = AlbumAggregator::new(
            new_registry(),
            relay.clone(),
            config.relay.album_window(),
            config.relay.album_max_wait(),
        );

        Self {
            gate: AccessGate::new(config.telegram.allowed_user_ids.iter().copied()),
            relay,
            albums,
            transport,
        }
    }

    /// Gate, then either buffer the message into its album or relay it directly.
    pub async fn route(&self, msg: InboundMessage) -> Result<Routed> {
        if let Err(reason) = self.gate.check(msg.chat_id) {
            info!("Refusing message from {}: {}", msg.chat_id, reason);
            self.transport.notify(msg.chat_id, DENIED_REPLY).await?;
            return Ok(Routed::Denied);
        }

        if msg.text().is_some_and(is_start_command) {
            self.transport.notify(msg.chat_id, GREETING).await?;
            return Ok(Routed::Greeted);
        }

        if let Some(group_id) = msg.media_group_id.clone() {
            let message_id = msg.message_id;
            let offer = self.albums.offer(&group_id, msg).await;
            match &offer {
                Offer::Opened(_) => debug!(
                    "Album {}: opened by message {}, {} album(s) collecting",
                    group_id,
                    message_id,
                    self.albums.pending().await
                ),
                Offer::Joined(position) => debug!(
                    "Album {}: message {} buffered as item {}",
                    group_id, message_id, position
                ),
            }
            return Ok(Routed::Buffered(offer));
        }

        if self.relay.relay_single(&msg).await? {
            Ok(Routed::Relayed)
        } else {
            Ok(Routed::Skipped)
        }
    }
}

/// Matches `/start` and `/start@botname`, with or without a payload.
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}
