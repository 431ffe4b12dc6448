pub mod error;
pub mod registry;

pub use error::{RegistryError, Result};
pub use registry::ChatRegistry;
