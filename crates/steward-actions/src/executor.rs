use async_trait::async_trait;
use steward_store::types::PendingAction;

/// Per-action-kind execution logic, supplied by whatever module owns that
/// capability (a skill, the planner, ...). Registered into the controller
/// by `kind` string.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Runs the action. The returned string becomes the outcome's `details`.
    async fn execute(&self, action: &PendingAction) -> Result<String, String>;

    /// Whether `undo` does anything meaningful for this kind — spec.md §4.9:
    /// "the most recent COMPLETE row ... whose kind advertises an undoable
    /// capability".
    fn is_undoable(&self) -> bool {
        false
    }

    /// Runs the compensating action. Only called when `is_undoable()` is true.
    async fn undo(&self, action: &PendingAction) -> Result<String, String> {
        let _ = action;
        Err("undo not implemented for this action kind".to_string())
    }
}
