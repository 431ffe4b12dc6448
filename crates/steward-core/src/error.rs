use thiserror::Error;

/// Error taxonomy (spec.md §7). Categories, not precise exception types —
/// each maps to a `.category()` string used by the gateway's FAILED-status
/// rendering and by operator alerting.
#[derive(Debug, Error)]
pub enum StewardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("busy: a pending action already exists for this user")]
    Busy,

    #[error("not undoable: {0}")]
    NotUndoable(String),

    #[error("provider transient error: {0}")]
    ProviderTransient(String),

    #[error("provider fatal error: {0}")]
    ProviderFatal(String),

    #[error("store error: {0}")]
    StoreFatal(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl StewardError {
    /// Category string, matching spec.md §7's taxonomy column exactly.
    pub fn category(&self) -> &'static str {
        match self {
            StewardError::InvalidInput(_) => "InvalidInput",
            StewardError::NotFound(_) => "NotFound",
            StewardError::Unauthorized => "Unauthorized",
            StewardError::Busy => "Busy",
            StewardError::NotUndoable(_) => "NotUndoable",
            StewardError::ProviderTransient(_) => "ProviderTransient",
            StewardError::ProviderFatal(_) => "ProviderFatal",
            StewardError::StoreFatal(_)
            | StewardError::Database(_)
            | StewardError::Io(_)
            | StewardError::Serialization(_) => "StoreFatal",
            StewardError::ConfigError(_) => "ConfigError",
        }
    }

    /// Unauthorized is handled silently — dispatcher drops with no reply.
    pub fn is_silent(&self) -> bool {
        matches!(self, StewardError::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, StewardError>;
