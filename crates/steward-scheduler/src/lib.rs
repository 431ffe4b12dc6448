//! Tokio-based job scheduler with SQLite persistence, driving C10-C12's
//! periodic jobs (`morningBrief`, `eveningDigest`, `heartbeat`,
//! `nightlyAutonomous`, `deadlineCheck`) — spec.md §4.12.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table. The [`engine::SchedulerEngine`]
//! polls the database every second and executes any job whose `next_run` has
//! arrived, updating state and computing the next scheduled time.
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                |
//! |------------|-------------------------------------------|
//! | `Once`     | Single fire at an absolute UTC instant     |
//! | `Interval` | Repeat every N seconds                     |
//! | `Daily`    | Fire at HH:MM UTC every day                |
//! | `Weekly`   | Fire at HH:MM UTC on a specific weekday    |
//! | `Cron`     | Full cron expression, via the `cron` crate |

pub mod db;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod handler;
pub mod schedule;
pub mod types;

pub use defaults::register_default_jobs;
pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use handler::{HandlerRegistry, JobHandler};
pub use types::{Job, JobStatus, Schedule};
