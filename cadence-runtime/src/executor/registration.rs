use super::ExecutorFuture;
use crate::task::ScheduledTask;

/// An executor registered at link time by the `#[executor]` attribute.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorRegistration {
    /// Name of the annotated function, for logging.
    pub name: &'static str,
    pub exec_type: &'static str,
    /// Empty string registers a wildcard for the whole `exec_type`.
    pub task_type: &'static str,
    pub handler: fn(ScheduledTask) -> ExecutorFuture<'static>,
}

/// Global distributed slice for collecting `#[executor]` functions
#[linkme::distributed_slice]
pub static EXECUTORS: [fn() -> ExecutorRegistration] = [..];
