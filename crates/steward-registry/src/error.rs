use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store error: {0}")]
    Store(#[from] steward_store::StoreError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
