pub mod engine;
pub mod error;
pub mod types;

pub use engine::{format_for_system_prompt, ContextEngine};
pub use error::{MemoryError, Result};
pub use types::{Context, ProjectSummary, ProjectSummarySource};
