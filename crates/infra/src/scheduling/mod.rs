//! Background scheduling for the synchronization pipeline.

mod error;
mod poll_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use poll_scheduler::{PollScheduler, PollSchedulerConfig};
