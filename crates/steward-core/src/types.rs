use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a user across platforms. Free-form — the platform's native
/// user id, as supplied by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifies a chat/conversation on a given platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChatId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChatId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The three message origins named in spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Primary,
    Secondary,
    Voice,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Primary => write!(f, "primary"),
            Platform::Secondary => write!(f, "secondary"),
            Platform::Voice => write!(f, "voice"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Platform::Primary),
            "secondary" => Ok(Platform::Secondary),
            "voice" => Ok(Platform::Voice),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// An attachment on an inbound message (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: String,
    pub url: String,
    pub mime: String,
}

/// Normalized inbound event — the only core wire contract, per spec.md §6.
/// Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform-assigned id, used for dedup.
    pub id: String,
    pub platform: Platform,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: Option<String>,
    /// Fetched by the core if present.
    pub voice_url: Option<String>,
    pub attachments: Vec<Attachment>,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

/// Media payload attached to an outbound reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMedia {
    pub url: String,
    pub caption: Option<String>,
}

/// Outbound chat message — pre-formatted by C14 or a skill; the core never
/// adds markup of its own (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub media: Option<OutboundMedia>,
    /// Platform-native quote, if the adapter supports it.
    pub reply_to_id: Option<String>,
}

/// A fresh random id for ephemeral, non-persisted correlation (connection
/// handles, request ids). UUIDv4 — no ordering requirement.
pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}

/// A fresh time-sortable id for persisted rows where log correlation by
/// creation order is useful (pending actions, alerts).
pub fn sortable_id() -> String {
    Uuid::now_v7().to_string()
}
