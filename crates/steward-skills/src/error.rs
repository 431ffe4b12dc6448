use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("io error reading skill manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid skill manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, SkillError>;
