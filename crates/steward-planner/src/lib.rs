pub mod error;
pub mod executor;
pub mod repo;
pub mod types;

pub use error::{PlannerError, Result};
pub use executor::PlanExecutor;
pub use repo::{GithubRepoProvider, RepoProvider};
pub use types::{FileChange, NullSink, Phase, ProgressEvent, ProgressSink};
