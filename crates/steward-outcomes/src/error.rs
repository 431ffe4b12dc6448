use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("store error: {0}")]
    Store(#[from] steward_store::StoreError),
}

pub type Result<T> = std::result::Result<T, OutcomeError>;
