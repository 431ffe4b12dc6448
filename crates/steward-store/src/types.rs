use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use steward_core::types::{ChatId, Platform, UserId};

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text)),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant)),+,
                    other => Err(format!(concat!(stringify!($name), ": unknown value {}"), other)),
                }
            }
        }
    };
}

text_enum!(ChatBindingType { Repo => "repo", Hq => "hq", Company => "company", Direct => "direct" });
text_enum!(NotificationLevel { All => "all", Critical => "critical", Digest => "digest" });
text_enum!(TaskStatus { Active => "active", Completed => "completed", Cancelled => "cancelled" });
text_enum!(PendingState {
    Pending => "pending",
    Confirmed => "confirmed",
    Rejected => "rejected",
    Expired => "expired",
    Executing => "executing",
    Complete => "complete",
    Failed => "failed",
    Undone => "undone",
});
text_enum!(OutcomeResult { Success => "success", Failed => "failed", Cancelled => "cancelled" });
text_enum!(AlertLevel { Info => "info", Warning => "warning", Critical => "critical", Emergency => "emergency" });
text_enum!(AlertTier { Primary => "primary", Secondary => "secondary", Voice => "voice" });

/// Keyed by `(platform, chatId)` — spec.md §3. Exactly one row per key;
/// rebinding a different type rewrites the row rather than inserting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBinding {
    pub platform: Platform,
    pub chat_id: ChatId,
    pub binding_type: ChatBindingType,
    pub value: String,
    pub notification_level: NotificationLevel,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Append-only conversation log entry — spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: i64,
    pub chat_id: ChatId,
    pub role: Role,
    pub text: String,
    pub ts: DateTime<Utc>,
}

/// Deduplicated by exact `(userId, key)` — writing an existing key replaces value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFact {
    pub user_id: UserId,
    pub key: String,
    pub value: String,
    pub source: String,
    pub ts: DateTime<Utc>,
}

/// Task / Goal / Reminder — spec.md §3. `current_value` is clamped to `[0,
/// inf)` at write time; display percent clamps separately to `[0,100]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: UserId,
    pub description: String,
    pub status: TaskStatus,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Percent complete, clamped to `[0, 100]`. `None` if no target is set.
    pub fn percent_complete(&self) -> Option<f64> {
        let (target, current) = (self.target_value?, self.current_value.unwrap_or(0.0));
        if target <= 0.0 {
            return None;
        }
        Some((current / target * 100.0).clamp(0.0, 100.0))
    }
}

/// Clamp a write to a task's progress value into `[0, inf)`.
pub fn clamp_progress(value: f64) -> f64 {
    value.max(0.0)
}

/// Short-lived proposed action — spec.md §3/§4.9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    pub user_id: UserId,
    pub kind: String,
    pub params: serde_json::Value,
    pub proposed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: PendingState,
}

/// Written only by C6 — spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub action_id: String,
    pub kind: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<OutcomeResult>,
    pub details: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOpKind {
    Read,
    Write,
    Create,
    Delete,
}

impl fmt::Display for FileOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOpKind::Read => write!(f, "read"),
            FileOpKind::Write => write!(f, "write"),
            FileOpKind::Create => write!(f, "create"),
            FileOpKind::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOp {
    pub op: FileOpKind,
    pub path: String,
    pub content_ref: Option<String>,
}

/// Spans many operations — spec.md §3/§4.10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub user_id: UserId,
    pub instruction_text: String,
    pub target_project: String,
    pub file_ops: Vec<FileOp>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub pr_url: Option<String>,
}

/// Persisted for open alerts — spec.md §3/§4.11.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub body: String,
    pub tier: AlertTier,
    pub created_at: DateTime<Utc>,
    pub next_escalate_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Caller-supplied dedup key; duplicates within 5 min collapse (§4.11).
    pub dedup_key: String,
}
