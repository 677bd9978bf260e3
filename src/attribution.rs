use teloxide::utils::html;

use crate::platform::{ForwardOrigin, InboundMessage};

/// Builds the "where did this come from" line appended to every relayed post.
#[derive(Debug, Clone)]
pub struct AttributionResolver {
    label: String,
    fallback: String,
}

impl AttributionResolver {
    /// `label` and `fallback` are trusted HTML from config and are not escaped.
    pub fn new(label: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fallback: fallback.into(),
        }
    }

    /// Attribution line for `msg`, starting with a blank line.
    pub fn resolve(&self, msg: &InboundMessage) -> String {
        format!("\n\n{} {}", self.label, self.source(msg))
    }

    fn source(&self, msg: &InboundMessage) -> String {
        match &msg.forward_origin {
            Some(ForwardOrigin::Chat {
                title,
                username: Some(username),
            }) => html::link(&public_url(username), title),
            Some(ForwardOrigin::Chat {
                title,
                username: None,
            }) => html::escape(title),
            Some(ForwardOrigin::User {
                full_name,
                username: Some(username),
            }) => html::link(&public_url(username), full_name),
            Some(_) => self.fallback.clone(),
            None => match &msg.author {
                Some(author) if !author.full_name.trim().is_empty() => {
                    html::link(&author.profile_url, &author.full_name)
                }
                _ => self.fallback.clone(),
            },
        }
    }
}

fn public_url(username: &str) -> String {
    format!("https://t.me/{username}")
}
