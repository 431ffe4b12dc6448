use async_trait::async_trait;
use steward_store::types::{Alert, AlertTier};

/// Abstracts the three delivery tiers so this crate doesn't depend directly
/// on `steward-channels` or a voice provider — mirrors `steward-planner`'s
/// `ProgressSink` split.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, tier: AlertTier, alert: &Alert) -> Result<(), String>;
}

pub struct NullSink;

#[async_trait]
impl AlertSink for NullSink {
    async fn deliver(&self, _tier: AlertTier, _alert: &Alert) -> Result<(), String> {
        Ok(())
    }
}
