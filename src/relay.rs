use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::album::{Album, AlbumSink};
use crate::attribution::AttributionResolver;
use crate::caption::{compose, CaptionPolicy, Placement};
use crate::error::{RelayError, Result};
use crate::platform::{Content, InboundMessage, MediaRef, Transport};

pub const UNSUPPORTED_ALBUM_REPLY: &str = "This type of album is not supported";

/// The outbound calls needed to relay one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPlan {
    Text { messages: Vec<String> },
    Media { media: MediaRef, caption: Placement },
    /// Media that can't carry a caption, relayed as-is.
    Bare { media: MediaRef },
    Album { items: Vec<MediaRef>, caption: Placement },
}

/// Republishes relayed units to the destination channel.
pub struct ContentRelay {
    transport: Arc<dyn Transport>,
    destination: i64,
    attribution: AttributionResolver,
    policy: CaptionPolicy,
    suffix: String,
}

impl ContentRelay {
    pub fn new(
        transport: Arc<dyn Transport>,
        destination: i64,
        attribution: AttributionResolver,
        policy: CaptionPolicy,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            destination,
            attribution,
            policy,
            suffix: suffix.into(),
        }
    }

    /// Plan a single, ungrouped message. `None` for content we don't relay.
    pub fn plan_single(&self, msg: &InboundMessage) -> Option<SendPlan> {
        let attribution = self.attribution.resolve(msg);
        match &msg.content {
            Content::Text(text) => {
                let tail = format!("{}{}", self.suffix, attribution);
                Some(SendPlan::Text {
                    messages: self.policy.text_messages(text, &tail),
                })
            }
            Content::Media { media, .. } if !media.kind.accepts_caption() => Some(SendPlan::Bare {
                media: media.clone(),
            }),
            Content::Media { media, caption } => {
                let composed = compose(caption.as_deref(), &self.suffix, &attribution);
                Some(SendPlan::Media {
                    media: media.clone(),
                    caption: self.policy.place(composed),
                })
            }
            Content::Other => None,
        }
    }

    /// Plan a finalized album. Fails without side effects if any item can't be grouped.
    ///
    /// A group that finalized with a single item (a late sibling, or a group
    /// whose other parts never arrived) is planned as one media message, since
    /// the platform refuses media groups of fewer than two items.
    pub fn plan_album(&self, album: &Album) -> Result<SendPlan> {
        let mut items = album
            .messages()
            .map(|m| match &m.content {
                Content::Media { media, .. } if media.kind.is_groupable() => Ok(media.clone()),
                other => Err(RelayError::UnsupportedAlbumMedia {
                    kind: other.kind_name(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let attribution = self.attribution.resolve(album.first());
        let composed = compose(album.caption(), &self.suffix, &attribution);
        let caption = self.policy.place(composed);
        if items.len() == 1 {
            return Ok(SendPlan::Media {
                media: items.remove(0),
                caption,
            });
        }
        Ok(SendPlan::Album { items, caption })
    }

    /// Relay one ungrouped message. Returns false if it was skipped.
    pub async fn relay_single(&self, msg: &InboundMessage) -> Result<bool> {
        let Some(plan) = self.plan_single(msg) else {
            debug!(
                "Skipping {} message {} from {}",
                msg.content.kind_name(),
                msg.message_id,
                msg.chat_id
            );
            return Ok(false);
        };
        self.execute(&plan).await?;
        info!(
            "Relayed {} message {} from {}",
            msg.content.kind_name(),
            msg.message_id,
            msg.chat_id
        );
        Ok(true)
    }

    pub async fn relay_album(&self, album: &Album) -> Result<()> {
        let plan = self.plan_album(album)?;
        self.execute(&plan).await?;
        info!(
            "Relayed album {} ({} items) from {}",
            album.group_id(),
            album.item_count(),
            album.first().chat_id
        );
        Ok(())
    }

    async fn execute(&self, plan: &SendPlan) -> Result<()> {
        let chat = self.destination;
        match plan {
            SendPlan::Text { messages } => {
                for text in messages {
                    self.transport.send_text(chat, text).await?;
                }
            }
            SendPlan::Bare { media } => {
                self.transport.send_media(chat, media, None).await?;
            }
            SendPlan::Media { media, caption } => {
                self.transport
                    .send_media(chat, media, caption.inline_caption())
                    .await?;
                self.send_trailing(caption).await?;
            }
            SendPlan::Album { items, caption } => {
                self.transport
                    .send_album(chat, items, caption.inline_caption())
                    .await?;
                self.send_trailing(caption).await?;
            }
        }
        Ok(())
    }

    async fn send_trailing(&self, caption: &Placement) -> Result<()> {
        if let Some(text) = caption.trailing_text() {
            self.transport.send_text(self.destination, text).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AlbumSink for ContentRelay {
    async fn flush(&self, album: Album) -> Result<()> {
        match self.relay_album(&album).await {
            Err(RelayError::UnsupportedAlbumMedia { kind }) => {
                warn!(
                    "Album {} from {} contains {}, not relayed",
                    album.group_id(),
                    album.first().chat_id,
                    kind
                );
                self.transport
                    .notify(album.first().chat_id, UNSUPPORTED_ALBUM_REPLY)
                    .await?;
                Ok(())
            }
            other => other,
        }
    }
}
