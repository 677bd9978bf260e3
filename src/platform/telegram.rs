use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, InputMedia, InputMediaAudio, InputMediaDocument, InputMediaPhoto,
    InputMediaVideo, LinkPreviewOptions, MessageOrigin, ParseMode,
};
use tracing::{debug, info, warn};

use crate::bot::{AppState, Routed};
use crate::error::RelayError;
use crate::platform::{
    Author, Content, ForwardOrigin, InboundMessage, MediaKind, MediaRef, Transport,
};

/// Run the Telegram long-polling loop until interrupted
pub async fn run(bot: Bot, state: Arc<AppState>) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("relay"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, state: Arc<AppState>) -> Result<(), RelayError> {
    let inbound = to_inbound(&msg);
    debug!(
        "Telegram {} message {} from chat {}",
        inbound.content.kind_name(),
        inbound.message_id,
        inbound.chat_id
    );

    match state.route(inbound).await {
        Ok(Routed::Skipped) => {
            debug!("Nothing to relay in message {}", msg.id.0);
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(
                "Failed to relay message {} from chat {} (retryable: {})",
                msg.id.0, msg.chat.id.0, e.is_retryable()
            );
            Err(e)
        }
    }
}

/// Reduce a Telegram message to the fields the relay works with
pub fn to_inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        message_id: msg.id.0,
        chat_id: msg.chat.id.0,
        author: msg.from.as_ref().map(|user| Author {
            full_name: user.full_name(),
            profile_url: user.url().to_string(),
        }),
        content: content_of(msg),
        forward_origin: msg.forward_origin().map(origin_of),
        media_group_id: msg.media_group_id().map(|id| id.0.clone()),
        received_at: msg.date,
    }
}

fn content_of(msg: &Message) -> Content {
    if let Some(text) = msg.text() {
        return Content::Text(text.to_string());
    }
    match media_of(msg) {
        Some(media) => Content::Media {
            media,
            caption: msg.caption().map(str::to_string),
        },
        None => Content::Other,
    }
}

fn media_of(msg: &Message) -> Option<MediaRef> {
    let (kind, file_id) = if let Some(sizes) = msg.photo() {
        // Sizes come smallest first
        (MediaKind::Photo, &sizes.last()?.file.id)
    } else if let Some(animation) = msg.animation() {
        (MediaKind::Animation, &animation.file.id)
    } else if let Some(video) = msg.video() {
        (MediaKind::Video, &video.file.id)
    } else if let Some(document) = msg.document() {
        (MediaKind::Document, &document.file.id)
    } else if let Some(audio) = msg.audio() {
        (MediaKind::Audio, &audio.file.id)
    } else if let Some(voice) = msg.voice() {
        (MediaKind::Voice, &voice.file.id)
    } else if let Some(note) = msg.video_note() {
        (MediaKind::VideoNote, &note.file.id)
    } else {
        return None;
    };
    Some(MediaRef::new(kind, file_id.0.clone()))
}

fn origin_of(origin: &MessageOrigin) -> ForwardOrigin {
    match origin {
        MessageOrigin::User { sender_user, .. } => ForwardOrigin::User {
            full_name: sender_user.full_name(),
            username: sender_user.username.clone(),
        },
        MessageOrigin::HiddenUser {
            sender_user_name, ..
        } => ForwardOrigin::Hidden {
            name: sender_user_name.clone(),
        },
        MessageOrigin::Chat { sender_chat, .. } => ForwardOrigin::Chat {
            title: sender_chat.title().unwrap_or_default().to_string(),
            username: sender_chat.username().map(str::to_string),
        },
        MessageOrigin::Channel { chat, .. } => ForwardOrigin::Chat {
            title: chat.title().unwrap_or_default().to_string(),
            username: chat.username().map(str::to_string),
        },
    }
}

/// Sends relayed content through the Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn input_file(media: &MediaRef) -> InputFile {
    InputFile::file_id(FileId(media.file_id.clone()))
}

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Album entry for `media`; the caption goes on this entry only.
fn album_entry(media: &MediaRef, caption: Option<&str>) -> Result<InputMedia> {
    let file = input_file(media);
    let entry = match media.kind {
        MediaKind::Photo => {
            let mut item = InputMediaPhoto::new(file).parse_mode(ParseMode::Html);
            if let Some(caption) = caption {
                item = item.caption(caption);
            }
            InputMedia::Photo(item)
        }
        MediaKind::Video => {
            let mut item = InputMediaVideo::new(file).parse_mode(ParseMode::Html);
            if let Some(caption) = caption {
                item = item.caption(caption);
            }
            InputMedia::Video(item)
        }
        MediaKind::Document => {
            let mut item = InputMediaDocument::new(file).parse_mode(ParseMode::Html);
            if let Some(caption) = caption {
                item = item.caption(caption);
            }
            InputMedia::Document(item)
        }
        MediaKind::Audio => {
            let mut item = InputMediaAudio::new(file).parse_mode(ParseMode::Html);
            if let Some(caption) = caption {
                item = item.caption(caption);
            }
            InputMedia::Audio(item)
        }
        other => bail!("{} cannot be part of an album", other),
    };
    Ok(entry)
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_link_preview())
            .await?;
        Ok(())
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<()> {
        let chat = ChatId(chat_id);
        let file = input_file(media);

        match media.kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::Document => {
                let mut req = self.bot.send_document(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::Audio => {
                let mut req = self.bot.send_audio(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::Animation => {
                let mut req = self.bot.send_animation(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::Voice => {
                let mut req = self.bot.send_voice(chat, file).parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::VideoNote => {
                self.bot.send_video_note(chat, file).await?;
            }
        }

        debug!(
            chat_id,
            kind = %media.kind,
            caption_len = caption.map_or(0, |c| c.chars().count()),
            "telegram media sent"
        );
        Ok(())
    }

    async fn send_album(
        &self,
        chat_id: i64,
        items: &[MediaRef],
        caption: Option<&str>,
    ) -> Result<()> {
        let media = items
            .iter()
            .enumerate()
            .map(|(i, item)| album_entry(item, if i == 0 { caption } else { None }))
            .collect::<Result<Vec<_>>>()?;

        self.bot.send_media_group(ChatId(chat_id), media).await?;
        debug!(chat_id, items = items.len(), "telegram album sent");
        Ok(())
    }

    async fn notify(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}
