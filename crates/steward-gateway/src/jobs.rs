//! Scheduler job handlers — the C12 → C1/C11 delivery edge (spec.md §2).
//! `SchedulerEngine::tick` looks handlers up by `handler_ref`, so each
//! standing job and the ad-hoc "reminder" job get their own `JobHandler`
//! registered under that key.

use std::sync::Arc;

use async_trait::async_trait;

use steward_alerts::AlertManager;
use steward_channels::ChannelManager;
use steward_core::reminder::ReminderAction;
use steward_scheduler::{Job, JobHandler};
use steward_store::types::AlertLevel;

/// Delivers an ad-hoc reminder whose `action` column holds a `ReminderAction`
/// JSON blob, straight to the owning channel — bypasses C9/C7/C5/C4 entirely,
/// since a fired reminder has nothing left to decide.
pub struct ReminderHandler {
    channels: Arc<ChannelManager>,
}

impl ReminderHandler {
    pub fn new(channels: Arc<ChannelManager>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl JobHandler for ReminderHandler {
    async fn handle(&self, job: &Job) -> Result<(), String> {
        let action: ReminderAction = serde_json::from_str(&job.action).map_err(|e| e.to_string())?;
        let channel_name = action.platform.to_string();
        self.channels
            .send_text(&channel_name, &action.chat_id, &action.message)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Surfaces the five standing jobs (spec.md §4.12) as an info-level alert —
/// none of them has a compiled skill to run yet (no `SkillHandler`
/// implementations are bundled in this build), so "running" them means
/// recording that they fired, not performing project work.
pub struct StandingJobHandler {
    alerts: Arc<AlertManager>,
}

impl StandingJobHandler {
    pub fn new(alerts: Arc<AlertManager>) -> Self {
        Self { alerts }
    }
}

#[async_trait]
impl JobHandler for StandingJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), String> {
        let body = format!("standing job '{}' fired", job.name);
        self.alerts
            .fire(AlertLevel::Info, &body, &format!("job:{}", job.name))
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

pub fn register_handlers(
    registry: &mut steward_scheduler::HandlerRegistry,
    channels: Arc<ChannelManager>,
    alerts: Arc<AlertManager>,
) {
    let reminder = Arc::new(ReminderHandler::new(channels));
    registry.register("reminder", reminder);

    let standing = Arc::new(StandingJobHandler::new(alerts));
    for name in ["morningBrief", "eveningDigest", "heartbeat", "nightlyAutonomous", "deadlineCheck"] {
        registry.register(name, standing.clone());
    }
}
