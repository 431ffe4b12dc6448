use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("store error: {0}")]
    Store(#[from] steward_store::StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] steward_provider::ProviderError),

    #[error("repo provider error: {0}")]
    Repo(String),

    #[error("analysis failed: {0}")]
    Analysis(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
