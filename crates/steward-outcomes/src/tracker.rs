use std::sync::Arc;

use chrono::Utc;
use steward_core::types::{random_id, UserId};
use steward_store::types::{Outcome, OutcomeResult};
use steward_store::StateStore;
use tracing::info;

use crate::error::Result;

/// Wraps `StateStore`'s outcome methods with the C6 API — spec.md §4.6.
/// Outcomes themselves carry no `userId` (they're keyed by `actionId`);
/// callers that need per-user formatting rely on `StateStore` joining
/// through the originating pending action.
pub struct OutcomeTracker {
    store: Arc<StateStore>,
}

impl OutcomeTracker {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Writes a row with `state=started`; returns the generated action id.
    pub fn start_action(&self, kind: &str, description: &str) -> Result<String> {
        let action_id = random_id();
        let outcome = Outcome {
            action_id: action_id.clone(),
            kind: kind.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            result: None,
            details: description.to_string(),
            feedback: None,
        };
        self.store.start_outcome(&outcome)?;
        info!(action_id, kind, "action started");
        Ok(action_id)
    }

    /// Idempotent on the terminal state: a second call with the same result
    /// is a no-op; a conflicting result is a hard error (spec.md §4.6).
    pub fn complete_action(&self, action_id: &str, result: OutcomeResult, details: &str) -> Result<()> {
        self.store.complete_outcome(action_id, result, details)?;
        info!(action_id, %result, "action completed");
        Ok(())
    }

    pub fn record_feedback(&self, action_id: &str, note: &str) -> Result<()> {
        self.store.record_feedback(action_id, note)?;
        Ok(())
    }

    /// Renders the most recent `n` outcomes for a user as a short text block.
    pub fn format_for_context(&self, user_id: &UserId, n: u32) -> Result<String> {
        let outcomes = self.store.recent_outcomes_for_user(user_id, n)?;
        if outcomes.is_empty() {
            return Ok(String::new());
        }
        let mut out = String::new();
        for o in outcomes {
            let result = o
                .result
                .map(|r| r.to_string())
                .unwrap_or_else(|| "in progress".to_string());
            out.push_str(&format!("- {} ({}): {}\n", o.kind, result, o.details));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_action_is_idempotent_on_same_result() {
        let store = Arc::new(StateStore::in_memory().unwrap());
        let tracker = OutcomeTracker::new(store);
        let id = tracker.start_action("deploy", "deploying service").unwrap();
        tracker.complete_action(&id, OutcomeResult::Success, "done").unwrap();
        tracker.complete_action(&id, OutcomeResult::Success, "done again").unwrap();
    }

    #[test]
    fn complete_action_errors_on_conflicting_result() {
        let store = Arc::new(StateStore::in_memory().unwrap());
        let tracker = OutcomeTracker::new(store);
        let id = tracker.start_action("deploy", "deploying service").unwrap();
        tracker.complete_action(&id, OutcomeResult::Success, "done").unwrap();
        let err = tracker.complete_action(&id, OutcomeResult::Failed, "actually failed");
        assert!(err.is_err());
    }
}
