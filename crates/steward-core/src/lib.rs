pub mod config;
pub mod error;
pub mod reminder;
pub mod types;

pub use error::{Result, StewardError};
