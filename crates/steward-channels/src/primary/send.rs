//! Message sending helpers for the primary (Telegram) adapter.
//!
//! Telegram's message limit is 4096 characters; spec.md §4.1 sets the
//! primary adapter's cap at 4096. Outbound text over the cap is
//! hard-truncated (see [`crate::truncate`]), not chunked into several
//! messages. Tries MarkdownV2 first; falls back to plain text if Telegram
//! rejects the parse mode (e.g. bad escaping) — a silent markdown downgrade,
//! as spec.md §4.1 allows.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::warn;

use crate::error::{ChannelError, Result};
use crate::truncate::hard_truncate;

pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Escape special characters for Telegram MarkdownV2.
///
/// MarkdownV2 requires escaping: `_ * [ ] ( ) ~ ` # + - = | { } . !`
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '#' | '+' | '-' | '=' | '|'
            | '{' | '}' | '.' | '!' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Send `text` to `chat_id`, hard-truncated at [`MAX_MESSAGE_LENGTH`].
///
/// Tries MarkdownV2 first; on rejection falls back to plain text.
pub async fn send_response(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    let truncated = hard_truncate(text, MAX_MESSAGE_LENGTH);
    let escaped = escape_markdown_v2(&truncated);

    let sent = bot
        .send_message(chat_id, &escaped)
        .parse_mode(ParseMode::MarkdownV2)
        .await;

    if sent.is_err() {
        bot.send_message(chat_id, &truncated)
            .await
            .map_err(|e| {
                warn!(error = %e, "telegram: failed to send plain-text fallback");
                ChannelError::SendFailed(e.to_string())
            })?;
    }

    Ok(())
}

/// Send a media URL with an optional caption. Telegram can't send arbitrary
/// remote URLs as native media without re-hosting them, so this degrades to
/// a text message containing the link — matching spec.md §4.1's allowance
/// that adapters MAY downgrade rich content silently.
pub async fn send_media(bot: &Bot, chat_id: ChatId, media_url: &str, caption: Option<&str>) -> Result<()> {
    let text = match caption {
        Some(c) => format!("{c}\n{media_url}"),
        None => media_url.to_string(),
    };
    send_response(bot, chat_id, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_markdown_v2_escapes_specials() {
        let input = "Hello. World! (test) [link] ~strike~";
        let escaped = escape_markdown_v2(input);
        assert!(escaped.contains("\\."));
        assert!(escaped.contains("\\!"));
        assert!(escaped.contains("\\("));
        assert!(escaped.contains("\\)"));
        assert!(escaped.contains("\\["));
        assert!(escaped.contains("\\]"));
        assert!(escaped.contains("\\~"));
    }

    #[test]
    fn escape_markdown_v2_leaves_normal_chars() {
        let input = "Hello world 123 abc";
        assert_eq!(escape_markdown_v2(input), input);
    }
}
