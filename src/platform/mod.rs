pub mod telegram;
#[cfg(test)]
pub mod testing;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Kinds of media the relay knows how to re-send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Animation,
    Voice,
    VideoNote,
}

impl MediaKind {
    /// Whether the platform accepts this kind inside a media group.
    pub fn is_groupable(self) -> bool {
        matches!(
            self,
            MediaKind::Photo | MediaKind::Video | MediaKind::Document | MediaKind::Audio
        )
    }

    /// Video notes can't carry a caption.
    pub fn accepts_caption(self) -> bool {
        !matches!(self, MediaKind::VideoNote)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
            MediaKind::Animation => "animation",
            MediaKind::Voice => "voice",
            MediaKind::VideoNote => "video note",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to media already stored on the platform, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

impl MediaRef {
    pub fn new(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
        }
    }
}

/// What a message carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Media {
        media: MediaRef,
        caption: Option<String>,
    },
    /// Stickers, polls, locations and anything else we don't relay.
    Other,
}

impl Content {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Media { media, .. } => media.kind.as_str(),
            Content::Other => "unsupported content",
        }
    }

    /// Caption of a media message, if it has a non-empty one.
    pub fn caption(&self) -> Option<&str> {
        match self {
            Content::Media {
                caption: Some(caption),
                ..
            } if !caption.is_empty() => Some(caption.as_str()),
            _ => None,
        }
    }
}

/// Where a forwarded message originally came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOrigin {
    /// A channel, or a group posting anonymously.
    Chat {
        title: String,
        username: Option<String>,
    },
    User {
        full_name: String,
        username: Option<String>,
    },
    /// A user who hides their account in forwards.
    Hidden { name: String },
}

/// The account that sent the message to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub full_name: String,
    pub profile_url: String,
}

/// A message received from the platform, reduced to what the relay needs
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message_id: i32,
    /// Chat the message was sent in; replies go here
    pub chat_id: i64,
    pub author: Option<Author>,
    pub content: Content,
    pub forward_origin: Option<ForwardOrigin>,
    /// Shared by every message of one album
    pub media_group_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Outbound side of the platform.
///
/// Texts and captions are HTML; implementations must send them with HTML
/// parsing enabled.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a text message with link previews disabled.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Post a single media item, picking the send call that matches its kind.
    async fn send_media(&self, chat_id: i64, media: &MediaRef, caption: Option<&str>)
        -> Result<()>;

    /// Post an album. The caption, if any, is attached to the first item.
    async fn send_album(&self, chat_id: i64, items: &[MediaRef], caption: Option<&str>)
        -> Result<()>;

    /// Send a plain service message back to a sender.
    async fn notify(&self, chat_id: i64, text: &str) -> Result<()>;
}
