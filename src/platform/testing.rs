//! In-memory transport and message builders shared by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{Author, Content, ForwardOrigin, InboundMessage, MediaKind, MediaRef, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
    },
    Media {
        chat_id: i64,
        media: MediaRef,
        caption: Option<String>,
    },
    Album {
        chat_id: i64,
        items: Vec<MediaRef>,
        caption: Option<String>,
    },
    Notice {
        chat_id: i64,
        text: String,
    },
}

/// Records every outbound call. Set `failing` to make relay sends error out.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let transport = Self::default();
        transport.failing.store(true, Ordering::SeqCst);
        transport
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn albums(&self) -> Vec<Vec<MediaRef>> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Album { items, .. } => Some(items),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) && !matches!(sent, Sent::Notice { .. }) {
            bail!("Bad Gateway");
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
        })
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<()> {
        self.record(Sent::Media {
            chat_id,
            media: media.clone(),
            caption: caption.map(str::to_string),
        })
    }

    async fn send_album(
        &self,
        chat_id: i64,
        items: &[MediaRef],
        caption: Option<&str>,
    ) -> Result<()> {
        self.record(Sent::Album {
            chat_id,
            items: items.to_vec(),
            caption: caption.map(str::to_string),
        })
    }

    async fn notify(&self, chat_id: i64, text: &str) -> Result<()> {
        self.record(Sent::Notice {
            chat_id,
            text: text.to_string(),
        })
    }
}

pub const SENDER_CHAT: i64 = 1001;

pub fn text_message(text: &str) -> InboundMessage {
    InboundMessage {
        message_id: 1,
        chat_id: SENDER_CHAT,
        author: Some(Author {
            full_name: "Alice".to_string(),
            profile_url: "tg://user?id=1001".to_string(),
        }),
        content: Content::Text(text.to_string()),
        forward_origin: None,
        media_group_id: None,
        received_at: Utc::now(),
    }
}

pub fn media_message(kind: MediaKind, file_id: &str, caption: Option<&str>) -> InboundMessage {
    InboundMessage {
        content: Content::Media {
            media: MediaRef::new(kind, file_id),
            caption: caption.map(str::to_string),
        },
        ..text_message("")
    }
}

pub fn grouped(group: &str, kind: MediaKind, file_id: &str, caption: Option<&str>) -> InboundMessage {
    InboundMessage {
        media_group_id: Some(group.to_string()),
        ..media_message(kind, file_id, caption)
    }
}

pub fn forwarded_from(mut msg: InboundMessage, origin: ForwardOrigin) -> InboundMessage {
    msg.forward_origin = Some(origin);
    msg
}
