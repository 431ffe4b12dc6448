pub mod error;
pub mod memory;
pub mod state;
pub mod types;

use std::sync::Arc;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use state::StateStore;

/// Both logical databases, opened together at startup (spec.md §4.2). Kept
/// as genuinely separate connections/files — see DESIGN.md's Open Question
/// resolution. `state` is `Arc`-wrapped so the gateway can hand the same
/// instance to `ChatRegistry`, `OutcomeTracker`, `ActionController`,
/// `AlertManager`, and `PlanExecutor` without opening a second connection.
pub struct Store {
    pub memory: MemoryStore,
    pub state: Arc<StateStore>,
}

impl Store {
    pub fn open(memory_db_path: &str, state_db_path: &str) -> Result<Self> {
        Ok(Self {
            memory: MemoryStore::open(memory_db_path)?,
            state: Arc::new(StateStore::open(state_db_path)?),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            memory: MemoryStore::in_memory()?,
            state: Arc::new(StateStore::in_memory()?),
        })
    }
}
