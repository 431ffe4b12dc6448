use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("store error: {0}")]
    Store(#[from] steward_store::StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] steward_registry::RegistryError),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
