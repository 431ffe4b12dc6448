use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, Utc};
use steward_core::types::sortable_id;
use steward_store::types::{Alert, AlertLevel, AlertTier};
use steward_store::StateStore;
use tracing::{info, warn};

use crate::delivery::AlertSink;
use crate::dnd::DndWindow;
use crate::error::Result;

/// Delay at every step of the escalation ladder (spec.md §4.11): Primary@0 →
/// Secondary@+15 → Voice@+15 more, i.e. Voice fires at t=30, not t=45.
const ESCALATION_STEP: Duration = Duration::minutes(15);

/// Whether a delivery at `tier` for an alert at `level` ignores the DND
/// window — spec.md §4.11's table, taken as the normative per-tier rule
/// (the narrower glossary gloss "critical/emergency delivered during DND"
/// is read as shorthand for this table, not a separate looser rule).
fn bypasses_dnd(level: AlertLevel, tier: AlertTier) -> bool {
    match level {
        AlertLevel::Info | AlertLevel::Warning => false,
        AlertLevel::Critical => tier == AlertTier::Voice,
        AlertLevel::Emergency => true,
    }
}

fn initial_tier(level: AlertLevel) -> AlertTier {
    match level {
        AlertLevel::Emergency => AlertTier::Voice,
        _ => AlertTier::Primary,
    }
}

fn next_tier(tier: AlertTier) -> Option<AlertTier> {
    match tier {
        AlertTier::Primary => Some(AlertTier::Secondary),
        AlertTier::Secondary => Some(AlertTier::Voice),
        AlertTier::Voice => None,
    }
}

/// Time of the next escalation for an alert currently at `tier`, or `None`
/// once it has reached the end of the ladder. Keyed off the *next* tier
/// being scheduled, not the tier just reached — every step is the same
/// [`ESCALATION_STEP`].
fn next_escalate_at(tier: AlertTier, from: chrono::DateTime<Utc>) -> Option<chrono::DateTime<Utc>> {
    next_tier(tier).map(|_| from + ESCALATION_STEP)
}

/// Drives the tiered primary→secondary→voice ladder — spec.md §4.11.
pub struct AlertManager {
    store: Arc<StateStore>,
    sink: Arc<dyn AlertSink>,
    dnd: DndWindow,
}

impl AlertManager {
    pub fn new(store: Arc<StateStore>, sink: Arc<dyn AlertSink>, dnd: DndWindow) -> Self {
        Self { store, sink, dnd }
    }

    /// Raises a new alert, or returns the existing one if `dedup_key`
    /// collapsed within the last 5 minutes (spec.md §4.11).
    pub async fn fire(&self, level: AlertLevel, body: &str, dedup_key: &str) -> Result<Alert> {
        if let Some(existing) = self.store.recent_alert_by_key(dedup_key)? {
            info!(dedup_key, id = %existing.id, "alert deduplicated");
            return Ok(existing);
        }

        let now = Utc::now();
        let tier = initial_tier(level);
        let auto_escalates = !matches!(level, AlertLevel::Info | AlertLevel::Emergency);
        let alert = Alert {
            id: sortable_id(),
            level,
            body: body.to_string(),
            tier,
            created_at: now,
            next_escalate_at: if auto_escalates { next_escalate_at(tier, now) } else { None },
            acknowledged_at: None,
            dedup_key: dedup_key.to_string(),
        };
        self.store.save_alert(&alert)?;
        self.deliver_if_allowed(&alert).await;
        Ok(alert)
    }

    pub fn ack(&self, id: &str) -> Result<()> {
        self.store.ack_alert(id)?;
        info!(id, "alert acknowledged");
        Ok(())
    }

    async fn deliver_if_allowed(&self, alert: &Alert) {
        if self.dnd.contains(Local::now()) && !bypasses_dnd(alert.level, alert.tier) {
            info!(id = %alert.id, tier = %alert.tier, "alert held by DND window");
            return;
        }
        if let Err(e) = self.sink.deliver(alert.tier, alert).await {
            warn!(id = %alert.id, tier = %alert.tier, error = %e, "alert delivery failed");
        }
    }

    /// One sweep: escalates every open alert whose `next_escalate_at` has
    /// arrived. Call this every second, mirroring the scheduler's tick.
    pub async fn tick(&self) -> Result<()> {
        let now = Utc::now();
        for mut alert in self.store.open_alerts_due(now)? {
            let Some(tier) = next_tier(alert.tier) else {
                // Already at voice with no further escalation; clear the
                // timer so it isn't re-selected every tick.
                alert.next_escalate_at = None;
                self.store.save_alert(&alert)?;
                continue;
            };
            alert.tier = tier;
            alert.next_escalate_at = next_escalate_at(tier, now);
            self.store.save_alert(&alert)?;
            info!(id = %alert.id, tier = %alert.tier, "alert escalated");
            self.deliver_if_allowed(&alert).await;
        }
        Ok(())
    }

    /// Runs `tick` every second until `shutdown` fires, the same cadence as
    /// `steward-scheduler`'s engine loop.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!("alert manager started");
        let mut interval = tokio::time::interval(StdDuration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("alert tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("alert manager shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_never_bypasses_dnd() {
        assert!(!bypasses_dnd(AlertLevel::Info, AlertTier::Primary));
    }

    #[test]
    fn critical_bypasses_dnd_only_at_voice_tier() {
        assert!(!bypasses_dnd(AlertLevel::Critical, AlertTier::Primary));
        assert!(!bypasses_dnd(AlertLevel::Critical, AlertTier::Secondary));
        assert!(bypasses_dnd(AlertLevel::Critical, AlertTier::Voice));
    }

    #[test]
    fn emergency_always_bypasses() {
        assert!(bypasses_dnd(AlertLevel::Emergency, AlertTier::Voice));
    }

    #[test]
    fn initial_tier_for_emergency_is_voice() {
        assert_eq!(initial_tier(AlertLevel::Emergency), AlertTier::Voice);
        assert_eq!(initial_tier(AlertLevel::Info), AlertTier::Primary);
    }

    #[test]
    fn escalation_chain_is_15_minutes_per_step() {
        let t0 = Utc::now();
        let at_secondary = next_escalate_at(AlertTier::Primary, t0).unwrap();
        assert_eq!(at_secondary, t0 + Duration::minutes(15));

        let at_voice = next_escalate_at(AlertTier::Secondary, at_secondary).unwrap();
        assert_eq!(at_voice, at_secondary + Duration::minutes(15));
        assert_eq!(at_voice, t0 + Duration::minutes(30));

        assert!(next_escalate_at(AlertTier::Voice, at_voice).is_none());
    }

    #[tokio::test]
    async fn duplicate_dedup_key_within_5_min_returns_same_alert() {
        let store = Arc::new(StateStore::in_memory().unwrap());
        let manager = AlertManager::new(store, Arc::new(crate::delivery::NullSink), DndWindow::default());
        let first = manager.fire(AlertLevel::Warning, "disk 90% full", "disk-90").await.unwrap();
        let second = manager.fire(AlertLevel::Warning, "disk 90% full", "disk-90").await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
