pub mod controller;
pub mod error;
pub mod executor;

pub use controller::ActionController;
pub use error::{ActionError, Result};
pub use executor::ActionExecutor;
