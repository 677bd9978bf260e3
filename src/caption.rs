use teloxide::utils::html;

/// Platform ceiling for a media caption.
pub const MAX_CAPTION_LEN: usize = 1024;

/// Platform ceiling for a text message.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Where the composed caption of a media unit ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Attached to the media (the first item for albums).
    Inline(String),
    /// Media goes out bare, followed by this as a text message.
    Trailing(String),
}

impl Placement {
    pub fn inline_caption(&self) -> Option<&str> {
        match self {
            Placement::Inline(caption) => Some(caption.as_str()),
            Placement::Trailing(_) => None,
        }
    }

    pub fn trailing_text(&self) -> Option<&str> {
        match self {
            Placement::Inline(_) => None,
            Placement::Trailing(text) => Some(text.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaptionPolicy {
    max_caption_len: usize,
    max_message_len: usize,
}

impl Default for CaptionPolicy {
    fn default() -> Self {
        Self::new(MAX_CAPTION_LEN)
    }
}

impl CaptionPolicy {
    pub fn new(max_caption_len: usize) -> Self {
        Self {
            max_caption_len,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    /// Decide placement for a fully composed caption.
    ///
    /// The limit applies to the text a reader sees, the way the platform
    /// measures it after parsing: tags don't count and an entity such as
    /// `&amp;` counts as one character.
    pub fn place(&self, composed: String) -> Placement {
        if visible_len(&composed) <= self.max_caption_len {
            Placement::Inline(composed)
        } else {
            Placement::Trailing(composed)
        }
    }

    /// Split a relayed text into messages that fit the platform limit.
    ///
    /// `text` is raw user text and gets escaped here; `tail` (suffix plus
    /// attribution) is HTML and is kept whole, on the last chunk if it fits.
    pub fn text_messages(&self, text: &str, tail: &str) -> Vec<String> {
        let mut chunks = split_escaped(text, self.max_message_len);
        let tail_len = tail.chars().count();

        match chunks.last_mut() {
            Some(last) if last.chars().count() + tail_len <= self.max_message_len => {
                last.push_str(tail)
            }
            _ => chunks.push(tail.trim_start().to_string()),
        }

        chunks.retain(|c| !c.is_empty());
        chunks
    }
}

/// Escaped caption, then the configured suffix, then the attribution line.
pub fn compose(caption: Option<&str>, suffix: &str, attribution: &str) -> String {
    let mut composed = caption.map(html::escape).unwrap_or_default();
    composed.push_str(suffix);
    composed.push_str(attribution);
    composed
}

/// Characters left once `html` is rendered: tags dropped, entities collapsed.
///
/// Input is our own composed markup, so every `<` opens a tag and every `&`
/// starts an entity. An `&` with no `;` after it is counted as itself.
fn visible_len(html: &str) -> usize {
    let mut len = 0;
    let mut chars = html.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                chars.by_ref().find(|&c| c == '>');
            }
            '&' => {
                let rest = chars.as_str();
                if let Some(end) = rest.find(';').filter(|&end| end <= 8) {
                    chars = rest[end + 1..].chars();
                }
                len += 1;
            }
            _ => len += 1,
        }
    }
    len
}

/// HTML-escape `text` and cut it into chunks of at most `max_len` characters,
/// preferring to break after a newline or space. Escape sequences are never
/// cut in half.
fn split_escaped(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    // Byte offset and char count of `current` just after its last break point
    let mut last_break: Option<(usize, usize)> = None;
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        let piece = html::escape(ch.encode_utf8(&mut buf));
        let piece_len = piece.chars().count();

        while current_len + piece_len > max_len && !current.is_empty() {
            match last_break.take() {
                Some((byte, len)) if byte < current.len() => {
                    let rest = current.split_off(byte);
                    chunks.push(std::mem::replace(&mut current, rest));
                    current_len -= len;
                }
                _ => {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
            }
        }

        current.push_str(&piece);
        current_len += piece_len;
        if ch == '\n' || ch == ' ' {
            last_break = Some((current.len(), current_len));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_at_limit_is_inline() {
        let composed = "a".repeat(MAX_CAPTION_LEN);
        let placement = CaptionPolicy::default().place(composed.clone());
        assert_eq!(placement, Placement::Inline(composed));
    }

    #[test]
    fn test_caption_over_limit_trails() {
        let composed = "a".repeat(MAX_CAPTION_LEN + 1);
        let placement = CaptionPolicy::default().place(composed.clone());
        assert_eq!(placement.inline_caption(), None);
        assert_eq!(placement.trailing_text(), Some(composed.as_str()));
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        // Cyrillic is two bytes per char in UTF-8
        let composed = "я".repeat(MAX_CAPTION_LEN);
        assert!(composed.len() > MAX_CAPTION_LEN);
        let placement = CaptionPolicy::default().place(composed);
        assert!(placement.inline_caption().is_some());
    }

    #[test]
    fn test_escaped_caption_counts_as_rendered() {
        // Each `&` escapes to five characters but renders as one
        let composed = compose(Some(&"&".repeat(MAX_CAPTION_LEN)), "", "");
        assert!(composed.chars().count() > MAX_CAPTION_LEN);
        let placement = CaptionPolicy::default().place(composed.clone());
        assert_eq!(placement, Placement::Inline(composed));

        let composed = compose(Some(&"<".repeat(MAX_CAPTION_LEN + 1)), "", "");
        assert!(CaptionPolicy::default().place(composed).inline_caption().is_none());
    }

    #[test]
    fn test_link_markup_is_not_counted() {
        let source = format!("\n\nSource: {}", html::link("https://t.me/daily_news", "Daily"));
        let caption = "a".repeat(MAX_CAPTION_LEN - "\n\nSource: Daily".chars().count());
        let composed = compose(Some(&caption), "", &source);
        assert!(composed.chars().count() > MAX_CAPTION_LEN);
        assert!(CaptionPolicy::default().place(composed).inline_caption().is_some());

        let composed = compose(Some(&format!("{caption}a")), "", &source);
        assert!(CaptionPolicy::default().place(composed).inline_caption().is_none());
    }

    #[test]
    fn test_visible_len() {
        assert_eq!(visible_len("plain"), 5);
        assert_eq!(visible_len("a &lt;b&gt; &amp; &#39;"), 9);
        assert_eq!(visible_len("<b>bold</b> <a href=\"x\">y</a>"), 6);
        assert_eq!(visible_len("#tag & more"), 11);
        assert_eq!(visible_len("я"), 1);
    }

    #[test]
    fn test_compose_order() {
        let composed = compose(Some("Look <here>"), "\n#tag", "\n\nSource: x");
        assert_eq!(composed, "Look &lt;here&gt;\n#tag\n\nSource: x");
    }

    #[test]
    fn test_compose_without_caption() {
        assert_eq!(compose(None, "\n#tag", "\n\nSource: x"), "\n#tag\n\nSource: x");
    }

    #[test]
    fn test_short_text_is_one_message() {
        let messages = CaptionPolicy::default().text_messages("hello", "\n\nSource: x");
        assert_eq!(messages, vec!["hello\n\nSource: x".to_string()]);
    }

    #[test]
    fn test_long_text_splits_on_whitespace() {
        let word = "abcdefghi ";
        let text = word.repeat(1000);
        let messages = CaptionPolicy::default().text_messages(&text, "\n\nSource: x");

        assert!(messages.len() >= 3);
        for m in &messages {
            assert!(m.chars().count() <= MAX_MESSAGE_LEN);
        }
        // Every chunk but the last ends on a word boundary
        for m in &messages[..messages.len() - 1] {
            assert!(m.ends_with(' '));
        }
        assert!(messages.last().unwrap().ends_with("Source: x"));
        let rejoined: String = messages.concat();
        assert_eq!(rejoined, format!("{text}\n\nSource: x"));
    }

    #[test]
    fn test_split_never_cuts_escape_sequences() {
        let text = "&".repeat(MAX_MESSAGE_LEN);
        let messages = CaptionPolicy::default().text_messages(&text, "");
        for m in &messages {
            assert!(m.chars().count() <= MAX_MESSAGE_LEN);
            assert!(m.ends_with("&amp;"));
        }
        assert_eq!(messages.concat(), "&amp;".repeat(MAX_MESSAGE_LEN));
    }

    #[test]
    fn test_tail_gets_own_message_when_last_chunk_is_full() {
        let text = "a".repeat(MAX_MESSAGE_LEN);
        let messages = CaptionPolicy::default().text_messages(&text, "\n\nSource: x");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], text);
        assert_eq!(messages[1], "Source: x");
    }
}
