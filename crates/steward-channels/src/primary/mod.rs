//! Primary adapter: long-polling `teloxide` bot — spec.md §4.1's primary
//! platform.

pub mod adapter;
pub mod allow;
pub mod attach;
pub mod handler;
pub mod send;
pub mod typing;

pub use adapter::PrimaryAdapter;
