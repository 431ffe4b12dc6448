//! Messaging adapters (C1) — spec.md §4.1.
//!
//! [`channel::Channel`] is the capability set every adapter implements
//! (`send_text`, `send_media`, `max_message_length`, `status`). [`primary`]
//! is a long-poll `teloxide`-backed adapter; [`secondary`] is HTTP-webhook-driven.
//! Both hard-truncate oversized outbound text (see [`truncate`]) instead of
//! chunking into multiple messages, and both forward normalized inbound
//! events to an [`channel::InboundSink`] the gateway provides — adapters
//! never interpret message content themselves.

pub mod channel;
pub mod error;
pub mod manager;
pub mod primary;
pub mod secondary;
pub mod truncate;
pub mod types;

pub use channel::{Channel, InboundSink};
pub use error::ChannelError;
pub use manager::ChannelManager;
pub use truncate::hard_truncate;
pub use types::ChannelStatus;
