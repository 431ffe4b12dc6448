use async_trait::async_trait;
use steward_core::types::{ChatId, InboundMessage};

use crate::{error::Result, types::ChannelStatus};

/// Common interface implemented by every adapter (primary long-poll,
/// secondary webhook-driven) — spec.md §4.1's capability set
/// `{sendText, sendMedia, receive, maxMessageLength}`.
///
/// `receive` isn't a trait method: the primary adapter drives its own
/// long-poll loop from `connect`, and the secondary adapter's inbound side
/// is fulfilled by the gateway's webhook handler constructing an
/// `InboundMessage` directly. Both paths converge on the same
/// [`InboundSink`].
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier for this channel (e.g. `"primary"`).
    fn name(&self) -> &str;

    /// Establish the connection to the external service. Implementations
    /// transition to [`ChannelStatus::Connected`] on success.
    async fn connect(&self) -> Result<()>;

    /// Gracefully close the connection.
    async fn disconnect(&self) -> Result<()>;

    /// Send plain/markdown text to `chat_id`, hard-truncating at
    /// [`Channel::max_message_length`] if needed.
    async fn send_text(&self, chat_id: &ChatId, text: &str) -> Result<()>;

    /// Send a media URL with an optional caption.
    async fn send_media(&self, chat_id: &ChatId, media_url: &str, caption: Option<&str>) -> Result<()>;

    /// Per-message character cap for this platform (spec.md §4.1: primary
    /// ≈4096, secondary ≈1600).
    fn max_message_length(&self) -> usize;

    /// Current runtime status, non-blocking.
    fn status(&self) -> ChannelStatus;
}

/// Delivery target for normalized inbound events — implemented by the
/// gateway, which owns C9/C8/C7/C5/C4 dispatch. Channels never interpret
/// message content themselves; they only normalize and hand off.
#[async_trait]
pub trait InboundSink: Send + Sync {
    async fn handle(&self, msg: InboundMessage);
}
