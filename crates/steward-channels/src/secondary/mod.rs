//! Secondary channel adapter — HTTP webhook-driven.
//!
//! Inbound delivery for this platform arrives as HTTP POSTs handled directly
//! by the gateway's webhook router (C13), which constructs an
//! `InboundMessage` and calls the shared `InboundSink` — this module only
//! owns the *outbound* side: pushing `sendText`/`sendMedia` calls to
//! `base_url` over `reqwest`, the way `steward-provider`'s HTTP providers do
//! (bearer auth header, JSON body, explicit status check).

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use steward_core::config::SecondaryChannelConfig;
use steward_core::types::ChatId;

use crate::channel::Channel;
use crate::error::{ChannelError, Result};
use crate::truncate::hard_truncate;
use crate::types::ChannelStatus;

pub const MAX_MESSAGE_LENGTH: usize = 1600;

pub struct SecondaryAdapter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    status: RwLock<ChannelStatus>,
}

impl SecondaryAdapter {
    pub fn new(config: SecondaryChannelConfig, token: Option<String>) -> Result<Self> {
        let base_url = config
            .base_url
            .ok_or_else(|| ChannelError::ConfigError("secondary adapter requires base_url".into()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token,
            status: RwLock::new(ChannelStatus::Disconnected),
        })
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn post_send(&self, body: serde_json::Value) -> Result<()> {
        let url = format!("{}/send", self.base_url.trim_end_matches('/'));
        let builder = self.client.post(&url).json(&body);

        let resp = self
            .apply_auth(builder)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "secondary: send rejected");
            return Err(ChannelError::SendFailed(format!("http {status}: {text}")));
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for SecondaryAdapter {
    fn name(&self) -> &str {
        "secondary"
    }

    async fn connect(&self) -> Result<()> {
        debug!(base_url = %self.base_url, "secondary: marking adapter connected");
        *self.status.write().await = ChannelStatus::Connected;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        *self.status.write().await = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn send_text(&self, chat_id: &ChatId, text: &str) -> Result<()> {
        let truncated = hard_truncate(text, MAX_MESSAGE_LENGTH);
        self.post_send(serde_json::json!({
            "chat_id": chat_id.as_str(),
            "text": truncated,
        }))
        .await
    }

    async fn send_media(&self, chat_id: &ChatId, media_url: &str, caption: Option<&str>) -> Result<()> {
        let caption = caption.map(|c| hard_truncate(c, MAX_MESSAGE_LENGTH));
        self.post_send(serde_json::json!({
            "chat_id": chat_id.as_str(),
            "media_url": media_url,
            "caption": caption,
        }))
        .await
    }

    fn max_message_length(&self) -> usize {
        MAX_MESSAGE_LENGTH
    }

    fn status(&self) -> ChannelStatus {
        // `status()` is intentionally non-blocking (see `Channel::status`);
        // a stale read under contention is an acceptable tradeoff here since
        // this adapter has no background loop to race against.
        self.status
            .try_read()
            .map(|s| s.clone())
            .unwrap_or(ChannelStatus::Connecting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_base_url() {
        let cfg = SecondaryChannelConfig { base_url: None };
        assert!(SecondaryAdapter::new(cfg, None).is_err());
    }

    #[test]
    fn new_accepts_base_url() {
        let cfg = SecondaryChannelConfig {
            base_url: Some("https://example.com".to_string()),
        };
        assert!(SecondaryAdapter::new(cfg, None).is_ok());
    }
}
