//! Telegram message handler registered in the teloxide Dispatcher.
//!
//! Normalizes an incoming `teloxide::Message` into a `steward_core::types::
//! InboundMessage` and hands it to the gateway's `InboundSink`. Everything
//! downstream of normalization (slash commands, skill dispatch, AI routing)
//! is the gateway's concern, not the adapter's — spec.md §4.1 only asks the
//! adapter to normalize and forward.

use std::sync::Arc;

use dashmap::DashMap;
use teloxide::prelude::*;
use tracing::debug;

use steward_core::types::{ChatId, InboundMessage, Platform, UserId};

use crate::channel::InboundSink;
use crate::primary::allow;
use crate::primary::attach::{self, ExtractedMedia};
use crate::primary::typing::TypingHandle;

/// Shared handler configuration + dependencies, injected into the teloxide
/// `Dispatcher` via `dptree::deps!`.
pub struct HandlerDeps {
    pub allow_users: Vec<String>,
    pub dm_allowed: bool,
    pub require_mention: bool,
    pub max_attachment_bytes: u64,
    pub sink: Arc<dyn InboundSink>,
    /// Typing indicators currently running, keyed by chat id — shared with
    /// the owning `PrimaryAdapter`, which stops the indicator in `send_text`
    /// once the reply for that chat is ready.
    pub typing: Arc<DashMap<ChatId, TypingHandle>>,
}

/// Main message handler registered in the teloxide Dispatcher.
///
/// Runs for every incoming `Message`:
/// 1. Bot-message filter
/// 2. Allowlist check (deny-by-default)
/// 3. DM guard
/// 4. `require_mention` guard for groups
/// 5. Normalize to `InboundMessage`
/// 6. Start a typing indicator and forward to the sink
pub async fn handle_message(bot: Bot, msg: Message, deps: Arc<HandlerDeps>) -> ResponseResult<()> {
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }

    let from = match msg.from.as_ref() {
        Some(u) => u,
        None => return Ok(()),
    };
    let username = from.username.as_deref().unwrap_or("");
    let user_id = from.id.0.to_string();

    if !allow::is_allowed(&deps.allow_users, username, &user_id) {
        return Ok(());
    }

    if msg.chat.is_private() && !deps.dm_allowed {
        return Ok(());
    }

    if (msg.chat.is_group() || msg.chat.is_supergroup()) && deps.require_mention {
        let bot_info = bot.get_me().await;
        let bot_username = bot_info
            .as_ref()
            .ok()
            .and_then(|me| me.user.username.as_deref())
            .unwrap_or("");
        let text_for_mention = msg.text().or(msg.caption()).unwrap_or("");
        if !contains_mention(text_for_mention, bot_username) {
            return Ok(());
        }
    }

    let text = msg.text().or(msg.caption()).map(|s| s.to_string());

    let has_media = msg.photo().is_some()
        || msg.document().is_some()
        || msg.video().is_some()
        || msg.audio().is_some()
        || msg.voice().is_some()
        || msg.sticker().is_some();

    if text.is_none() && !has_media {
        return Ok(());
    }

    let (voice_url, attachments) = match attach::extract_media(&bot, &msg, deps.max_attachment_bytes).await {
        ExtractedMedia::Voice(url) => (Some(url), Vec::new()),
        ExtractedMedia::Attachment(a) => (None, vec![a]),
        ExtractedMedia::None => (None, Vec::new()),
    };

    let chat_id = ChatId(msg.chat.id.0.to_string());
    let inbound = InboundMessage {
        id: msg.id.0.to_string(),
        platform: Platform::Primary,
        chat_id: chat_id.clone(),
        user_id: UserId(user_id),
        text,
        voice_url,
        attachments,
        received_at: msg.date,
    };

    debug!(chat_id = %chat_id, "telegram: forwarding inbound message to sink");

    let typing = TypingHandle::start(bot.clone(), msg.chat.id);
    deps.typing.insert(chat_id, typing);

    deps.sink.handle(inbound).await;

    Ok(())
}

/// Return `true` if `text` contains a `@bot_username` mention.
fn contains_mention(text: &str, bot_username: &str) -> bool {
    if bot_username.is_empty() {
        return false;
    }
    let mention = format!("@{bot_username}");
    text.contains(&mention)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_mention_positive() {
        assert!(contains_mention("Hey @mybot, help!", "mybot"));
    }

    #[test]
    fn contains_mention_negative() {
        assert!(!contains_mention("Hello there", "mybot"));
    }

    #[test]
    fn contains_mention_empty_username() {
        assert!(!contains_mention("@foo bar", ""));
    }
}
