use crate::engine::SchedulerHandle;
use crate::error::Result;
use crate::types::Schedule;

/// Registers the five standing jobs named in spec.md §4.12. Idempotent:
/// re-running on every startup just re-inserts rows with fresh ids, so
/// callers should only invoke this once against an empty `jobs` table (a
/// fresh deploy) rather than on every process start.
pub fn register_default_jobs(handle: &SchedulerHandle, nightly_autonomous_hour: u8) -> Result<()> {
    handle.add_job("morningBrief", "morningBrief", Schedule::Daily { hour: 7, minute: 0 }, "{}")?;
    handle.add_job("eveningDigest", "eveningDigest", Schedule::Daily { hour: 18, minute: 0 }, "{}")?;
    handle.add_job("heartbeat", "heartbeat", Schedule::Interval { every_secs: 4 * 3600 }, "{}")?;
    handle.add_job(
        "nightlyAutonomous",
        "nightlyAutonomous",
        Schedule::Daily { hour: nightly_autonomous_hour, minute: 0 },
        "{}",
    )?;
    handle.add_job("deadlineCheck", "deadlineCheck", Schedule::Interval { every_secs: 3600 }, "{}")?;
    Ok(())
}
