use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::{channel::Channel, error::ChannelError, error::Result, types::ChannelStatus};

/// Minimum delay between reconnect attempts (seconds).
const BACKOFF_BASE_SECS: u64 = 5;
/// Maximum delay between reconnect attempts (seconds) — capped at 60s per
/// spec.md §4.1.
const BACKOFF_MAX_SECS: u64 = 60;
/// Maximum number of reconnect attempts before giving up.
const MAX_ATTEMPTS: u32 = 10;
/// Jitter fraction applied to each delay (±10 %).
const JITTER_FRACTION: f64 = 0.10;

/// Manages a collection of channel adapters, keyed by [`Channel::name`].
///
/// Channels are stored behind `Arc` so a single adapter instance can be
/// shared between the manager and any background task it spawns (e.g. the
/// primary adapter's long-poll dispatcher). The manager applies exponential
/// backoff with jitter when a channel connection fails.
#[derive(Default)]
pub struct ChannelManager {
    channels: HashMap<String, Arc<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel adapter. Replaces any existing adapter of the same name.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        info!(channel = %name, "registering channel adapter");
        self.channels.insert(name, channel);
    }

    /// Connect all registered channels, each with independent backoff.
    pub async fn connect_all(&self) {
        for (name, channel) in self.channels.iter() {
            info!(channel = %name, "connecting channel");
            if let Err(e) = connect_with_backoff(name, channel.as_ref()).await {
                error!(channel = %name, error = %e, "failed to connect channel after retries");
            }
        }
    }

    /// Disconnect all registered channels. Errors are logged, not propagated.
    pub async fn disconnect_all(&self) {
        for (name, channel) in self.channels.iter() {
            info!(channel = %name, "disconnecting channel");
            if let Err(e) = channel.disconnect().await {
                warn!(channel = %name, error = %e, "error while disconnecting channel");
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Channel>> {
        self.channels.get(name).cloned()
    }

    /// Send text through the named channel, or `NotRegistered` if absent.
    /// Used by the scheduler (C12) and alert manager (C11) to deliver
    /// proactive messages without depending on a specific adapter type.
    pub async fn send_text(&self, channel_name: &str, chat_id: &steward_core::types::ChatId, text: &str) -> Result<()> {
        let channel = self
            .get(channel_name)
            .ok_or_else(|| ChannelError::NotRegistered(channel_name.to_string()))?;
        channel.send_text(chat_id, text).await
    }

    /// Current status of every registered channel, sorted by name.
    pub fn statuses(&self) -> Vec<(String, ChannelStatus)> {
        let mut result: Vec<(String, ChannelStatus)> = self
            .channels
            .iter()
            .map(|(name, ch)| (name.clone(), ch.status()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Attempt to connect a single channel with exponential backoff and ±10% jitter.
/// Schedule: 5s → 10s → 20s → … → 60s (cap), up to [`MAX_ATTEMPTS`] tries.
async fn connect_with_backoff(name: &str, channel: &dyn Channel) -> Result<()> {
    let mut delay_secs = BACKOFF_BASE_SECS;

    for attempt in 1..=MAX_ATTEMPTS {
        match channel.connect().await {
            Ok(()) => {
                info!(channel = %name, attempt, "channel connected successfully");
                return Ok(());
            }
            Err(e) if attempt == MAX_ATTEMPTS => {
                return Err(e);
            }
            Err(e) => {
                let jitter = jitter_secs(delay_secs);
                let total = delay_secs + jitter;
                warn!(
                    channel = %name,
                    attempt,
                    max = MAX_ATTEMPTS,
                    error = %e,
                    retry_after_secs = total,
                    "channel connect failed, retrying with backoff"
                );
                sleep(Duration::from_secs(total)).await;
                delay_secs = (delay_secs * 2).min(BACKOFF_MAX_SECS);
            }
        }
    }

    unreachable!("backoff loop exited without returning")
}

/// Jitter offset (0 … `JITTER_FRACTION * base_secs`) in integer seconds.
/// Derived from the current wall-clock subsecond nanos rather than pulling
/// in a `rand` dependency.
fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}
