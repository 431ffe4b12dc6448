//! Reminder delivery payload — shared between `steward-scheduler` and the
//! channel adapters that actually deliver the message.

use serde::{Deserialize, Serialize};

use crate::types::{ChatId, Platform};

/// Stored as a JSON string in the scheduler's `jobs.action` column (spec.md
/// §3's ScheduledJob). Parsed by the gateway when the job fires and handed
/// to the matching `Channel::send_text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderAction {
    pub platform: Platform,
    pub chat_id: ChatId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Parsed and ready-to-send reminder, passed from the scheduler's delivery
/// loop to the owning channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderDelivery {
    /// Originating job id, for logging.
    pub job_id: String,
    pub platform: Platform,
    pub chat_id: ChatId,
    pub message: String,
    pub image_url: Option<String>,
}
