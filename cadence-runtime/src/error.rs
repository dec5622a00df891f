use std::time::Duration;

use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

/// Error type returned by executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification so callers can tell "already stopped" apart from
/// "broken schedule".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad cron expression, task disabled in the store. Never retried.
    Configuration,
    /// No live job, or no definition in the store.
    NotFound,
    /// Store, trigger clock, or a stopped scheduler.
    Unavailable,
}

/// Errors surfaced by the scheduler's administrative API.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression {expression:?} for task {task_id}: {reason}")]
    InvalidCron {
        task_id: i64,
        expression: String,
        reason: String,
    },

    #[error("task {id} is not enabled")]
    TaskDisabled { id: i64 },

    #[error("task {id} is not scheduled")]
    NotScheduled { id: i64 },

    #[error("task {id} not found")]
    TaskNotFound { id: i64 },

    #[error("task store error: {0}")]
    Store(#[from] StoreError),

    #[error("trigger clock error: {0}")]
    Clock(#[from] JobSchedulerError),

    #[error("scheduler has been stopped")]
    Stopped,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SchedulerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::InvalidCron { .. }
            | SchedulerError::TaskDisabled { .. }
            | SchedulerError::Config(_) => ErrorKind::Configuration,
            SchedulerError::NotScheduled { .. } | SchedulerError::TaskNotFound { .. } => {
                ErrorKind::NotFound
            }
            SchedulerError::Store(_) | SchedulerError::Clock(_) | SchedulerError::Stopped => {
                ErrorKind::Unavailable
            }
        }
    }
}

/// Outcome of a failed execution. Recorded and logged, never propagated to
/// the trigger clock.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no executor registered for exec_type={exec_type:?} task_type={task_type:?}")]
    NoExecutor { exec_type: String, task_type: String },

    #[error("executor failed: {0}")]
    Failed(#[source] BoxError),

    #[error("executor panicked: {0}")]
    Panicked(String),

    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors reported by task stores and execution log sinks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid duration {value:?} for {key} (expected e.g. \"500ms\", \"30s\", \"5m\")")]
    InvalidDuration { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        let invalid = SchedulerError::InvalidCron {
            task_id: 1,
            expression: "not-a-cron".into(),
            reason: "bad".into(),
        };
        assert_eq!(invalid.kind(), ErrorKind::Configuration);
        assert_eq!(SchedulerError::NotScheduled { id: 1 }.kind(), ErrorKind::NotFound);
        assert_eq!(SchedulerError::TaskNotFound { id: 1 }.kind(), ErrorKind::NotFound);
        assert_eq!(
            SchedulerError::from(StoreError::Backend("down".into())).kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn no_executor_is_distinct_from_failure() {
        let missing = ExecutionError::NoExecutor {
            exec_type: "cleanup".into(),
            task_type: String::new(),
        };
        assert!(missing.to_string().starts_with("no executor registered"));

        let failed = ExecutionError::Failed("disk full".into());
        assert_eq!(failed.to_string(), "executor failed: disk full");
    }
}
