use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use steward_core::types::{sortable_id, UserId};
use steward_outcomes::OutcomeTracker;
use steward_store::types::{OutcomeResult, PendingAction, PendingState};
use steward_store::StateStore;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::error::{ActionError, Result};
use crate::executor::ActionExecutor;

const EXPIRY_WINDOW: Duration = Duration::minutes(5);

/// Propose → confirm/reject → execute → (undo) state machine per userId —
/// spec.md §4.9. Auto-approved kinds skip straight to EXECUTING.
pub struct ActionController {
    store: Arc<StateStore>,
    outcomes: Arc<OutcomeTracker>,
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
    auto_approve: HashSet<String>,
    /// One advisory lock per user so propose/confirm/reject/undo serialize
    /// per-user without a global lock.
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl ActionController {
    pub fn new(
        store: Arc<StateStore>,
        outcomes: Arc<OutcomeTracker>,
        executors: HashMap<String, Arc<dyn ActionExecutor>>,
        auto_approve: HashSet<String>,
    ) -> Self {
        Self {
            store,
            outcomes,
            executors,
            auto_approve,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<AsyncMutex<()>> {
        self.locks
            .entry(user_id.as_str().to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn executor_for(&self, kind: &str) -> Result<Arc<dyn ActionExecutor>> {
        self.executors
            .get(kind)
            .cloned()
            .ok_or_else(|| ActionError::UnknownKind(kind.to_string()))
    }

    /// `propose(kind, params, autoApprove?)` — spec.md §4.9. Returns the
    /// created row's id. Auto-approved kinds run immediately and the
    /// returned action will already be in a terminal state.
    pub async fn propose(
        &self,
        user_id: &UserId,
        kind: &str,
        params: serde_json::Value,
        supersede: bool,
    ) -> Result<PendingAction> {
        let executor = self.executor_for(kind)?;
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let state = if self.auto_approve.contains(kind) {
            PendingState::Executing
        } else {
            PendingState::Pending
        };

        let action = PendingAction {
            id: sortable_id(),
            user_id: user_id.clone(),
            kind: kind.to_string(),
            params,
            proposed_at: now,
            expires_at: now + EXPIRY_WINDOW,
            state,
        };

        match self.store.propose_action(&action, supersede) {
            Ok(()) => {}
            Err(steward_store::StoreError::Busy) => return Err(ActionError::Busy),
            Err(e) => return Err(e.into()),
        }

        if action.state == PendingState::Executing {
            info!(user_id = %user_id, kind, "action auto-approved, executing immediately");
            return self.run(action, &executor).await;
        }

        info!(user_id = %user_id, kind, action_id = %action.id, "action proposed, awaiting confirmation");
        Ok(action)
    }

    pub async fn confirm(&self, user_id: &UserId) -> Result<PendingAction> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let pending = self.store.current_pending(user_id)?.ok_or(ActionError::NoPending)?;
        let executor = self.executor_for(&pending.kind)?;

        self.store.set_action_state(&pending.id, PendingState::Confirmed)?;
        let mut action = pending;
        action.state = PendingState::Confirmed;

        self.store.set_action_state(&action.id, PendingState::Executing)?;
        action.state = PendingState::Executing;

        self.run(action, &executor).await
    }

    pub async fn reject(&self, user_id: &UserId) -> Result<PendingAction> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let mut pending = self.store.current_pending(user_id)?.ok_or(ActionError::NoPending)?;
        self.store.set_action_state(&pending.id, PendingState::Rejected)?;
        pending.state = PendingState::Rejected;
        info!(user_id = %user_id, action_id = %pending.id, "action rejected");
        Ok(pending)
    }

    /// Compensating action for the most recent COMPLETE row within the last
    /// 24h whose kind is undoable — spec.md §4.9.
    pub async fn undo(&self, user_id: &UserId) -> Result<PendingAction> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let last = self
            .store
            .last_complete_action(user_id)?
            .ok_or_else(|| ActionError::NotUndoable("no completed action in the last 24h".to_string()))?;

        let executor = self.executor_for(&last.kind)?;
        if !executor.is_undoable() {
            return Err(ActionError::NotUndoable(last.kind.clone()));
        }

        match executor.undo(&last).await {
            Ok(details) => {
                self.store.set_action_state(&last.id, PendingState::Undone)?;
                self.outcomes.record_feedback(&last.id, &format!("undone: {details}")).ok();
                let mut undone = last;
                undone.state = PendingState::Undone;
                Ok(undone)
            }
            Err(e) => {
                warn!(action_id = %last.id, error = %e, "undo failed");
                Err(ActionError::ExecutionFailed(e))
            }
        }
    }

    /// Lazily reaps expired PENDING rows — called by both on-read checks
    /// inside `StateStore` and a 60s background sweeper the caller drives.
    pub fn reap_expired(&self) -> Result<usize> {
        Ok(self.store.reap_expired()?)
    }

    async fn run(&self, mut action: PendingAction, executor: &Arc<dyn ActionExecutor>) -> Result<PendingAction> {
        let outcome_id = self.outcomes.start_action(&action.kind, &describe(&action)).ok();

        match executor.execute(&action).await {
            Ok(details) => {
                self.store.set_action_state(&action.id, PendingState::Complete)?;
                action.state = PendingState::Complete;
                if let Some(id) = &outcome_id {
                    self.outcomes.complete_action(id, OutcomeResult::Success, &details).ok();
                }
                info!(action_id = %action.id, kind = %action.kind, "action completed");
            }
            Err(err) => {
                self.store.set_action_state(&action.id, PendingState::Failed)?;
                action.state = PendingState::Failed;
                if let Some(id) = &outcome_id {
                    self.outcomes.complete_action(id, OutcomeResult::Failed, &err).ok();
                }
                warn!(action_id = %action.id, kind = %action.kind, error = %err, "action failed");
            }
        }
        Ok(action)
    }
}

fn describe(action: &PendingAction) -> String {
    format!("{} for {}", action.kind, action.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysSucceeds;

    #[async_trait]
    impl ActionExecutor for AlwaysSucceeds {
        async fn execute(&self, _action: &PendingAction) -> std::result::Result<String, String> {
            Ok("done".to_string())
        }
    }

    #[tokio::test]
    async fn auto_approved_run_leaves_outcome_in_terminal_state() {
        let store = Arc::new(StateStore::in_memory().unwrap());
        let outcomes = Arc::new(OutcomeTracker::new(Arc::clone(&store)));
        let mut executors: HashMap<String, Arc<dyn ActionExecutor>> = HashMap::new();
        executors.insert("noop".to_string(), Arc::new(AlwaysSucceeds));
        let mut auto_approve = HashSet::new();
        auto_approve.insert("noop".to_string());

        let controller = ActionController::new(store.clone(), outcomes, executors, auto_approve);
        let user_id = UserId::from("u1");
        controller
            .propose(&user_id, "noop", serde_json::json!({}), false)
            .await
            .unwrap();

        let recorded = store.recent_outcomes(10).unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].result, Some(OutcomeResult::Success));
        assert!(recorded[0].completed_at.is_some());
    }
}
