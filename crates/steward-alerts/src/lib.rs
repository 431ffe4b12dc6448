pub mod delivery;
pub mod dnd;
pub mod error;
pub mod manager;

pub use delivery::{AlertSink, NullSink};
pub use dnd::DndWindow;
pub use error::{AlertError, Result};
pub use manager::AlertManager;
