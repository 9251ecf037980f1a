//! nodewatch scheduler
//!
//! Cooperative single-threaded event loop. Deferred tasks run on a later
//! tick and can be cancelled until they fire; spawned tasks run as soon as
//! the current unit of work yields back to the loop.

mod config;
mod event_loop;

pub use config::LoopConfig;
pub use event_loop::{EventLoop, TaskId, TaskKind};

/// Scheduler error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Event loop still busy after {ticks} ticks")]
    TickLimitExceeded { ticks: usize },
}
