mod definition;
mod log;

pub use definition::{
    PageRequest, PaginatedResult, ScheduledTask, TaskFilter, TaskPatch, TaskStatus,
};
pub use log::{ExecuteResult, TaskExecutionLog};
