//! Primary channel adapter — long-polling `teloxide` bot.
//!
//! Wraps a teloxide `Bot` + `Dispatcher`, driving the long-poll loop on a
//! background task so `connect()` can return immediately (spec.md §4.1
//! treats `connect` as "become ready", not "run forever"). Reconnects are
//! the `ChannelManager`'s concern, not this adapter's.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use teloxide::prelude::*;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use steward_core::config::PrimaryChannelConfig;
use steward_core::types::ChatId as CoreChatId;

use crate::channel::{Channel, InboundSink};
use crate::error::{ChannelError, Result};
use crate::primary::handler::{handle_message, HandlerDeps};
use crate::primary::send;
use crate::types::ChannelStatus;

pub struct PrimaryAdapter {
    bot: Bot,
    config: PrimaryChannelConfig,
    allow_users: Vec<String>,
    sink: Arc<dyn InboundSink>,
    typing: Arc<DashMap<CoreChatId, crate::primary::typing::TypingHandle>>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl PrimaryAdapter {
    pub fn new(
        bot_token: &str,
        config: PrimaryChannelConfig,
        allow_users: Vec<String>,
        sink: Arc<dyn InboundSink>,
    ) -> Self {
        Self {
            bot: Bot::new(bot_token),
            config,
            allow_users,
            sink,
            typing: Arc::new(DashMap::new()),
            dispatch_handle: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Channel for PrimaryAdapter {
    fn name(&self) -> &str {
        "primary"
    }

    async fn connect(&self) -> Result<()> {
        let bot = self.bot.clone();
        let deps = Arc::new(HandlerDeps {
            allow_users: self.allow_users.clone(),
            dm_allowed: self.config.dm_allowed,
            require_mention: self.config.require_mention,
            max_attachment_bytes: self.config.max_attachment_bytes,
            sink: Arc::clone(&self.sink),
            typing: Arc::clone(&self.typing),
        });

        info!("primary: starting long-polling dispatcher");

        let handler = Update::filter_message().endpoint(handle_message);
        let join = tokio::spawn(async move {
            Dispatcher::builder(bot, handler)
                .dependencies(dptree::deps![deps])
                .default_handler(|_upd| async {})
                .build()
                .dispatch()
                .await;
        });

        *self.dispatch_handle.lock().await = Some(join);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(handle) = self.dispatch_handle.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn send_text(&self, chat_id: &CoreChatId, text: &str) -> Result<()> {
        if let Some((_, typing)) = self.typing.remove(chat_id) {
            typing.stop();
        }
        let tg_chat_id = parse_chat_id(chat_id)?;
        send::send_response(&self.bot, tg_chat_id, text).await
    }

    async fn send_media(&self, chat_id: &CoreChatId, media_url: &str, caption: Option<&str>) -> Result<()> {
        if let Some((_, typing)) = self.typing.remove(chat_id) {
            typing.stop();
        }
        let tg_chat_id = parse_chat_id(chat_id)?;
        send::send_media(&self.bot, tg_chat_id, media_url, caption).await
    }

    fn max_message_length(&self) -> usize {
        send::MAX_MESSAGE_LENGTH
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus::Connected
    }
}

fn parse_chat_id(chat_id: &CoreChatId) -> Result<ChatId> {
    chat_id
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| ChannelError::ConfigError(format!("invalid telegram chat id: {chat_id}")))
}
