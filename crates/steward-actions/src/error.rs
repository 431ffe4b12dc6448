use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("store error: {0}")]
    Store(#[from] steward_store::StoreError),

    #[error("a pending action already exists for this user")]
    Busy,

    #[error("no pending action for this user")]
    NoPending,

    #[error("action {0} has no undoable compensating action, or none completed in the last 24h")]
    NotUndoable(String),

    #[error("executor error: {0}")]
    ExecutionFailed(String),

    #[error("no executor registered for action kind {0}")]
    UnknownKind(String),
}

pub type Result<T> = std::result::Result<T, ActionError>;
