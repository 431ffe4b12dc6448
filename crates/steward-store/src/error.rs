use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("a pending action already exists for this user")]
    Busy,

    #[error("conflicting outcome for action {action_id}: already {existing}, got {attempted}")]
    ConflictingOutcome {
        action_id: String,
        existing: String,
        attempted: String,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
