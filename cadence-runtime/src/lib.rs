//! Cadence Runtime - dynamic cron scheduling for persisted task definitions
//!
//! This crate provides the scheduling engine, the executor registry, the
//! collaborator traits for task stores and execution logs, and the config and
//! logging plumbing around them.

mod config;
mod error;
mod executor;
mod scheduler;
mod store;
mod task;
pub mod telemetry;
mod time_unit;

// Re-export public API
pub use config::{
    load_toml_config, load_yaml_config, AppConfig, LogFormat, LoggingSettings, SchedulerSettings,
    ENV_PREFIX,
};
pub use error::{BoxError, ConfigError, ErrorKind, ExecutionError, Result, SchedulerError, StoreError};
pub use executor::{
    Executor, ExecutorFuture, ExecutorKey, ExecutorRegistration, ExecutorRegistry, FnExecutor,
    EXECUTORS,
};
pub use async_trait::async_trait;
pub use linkme;
pub use scheduler::{JobSnapshot, TaskRunner, TaskScheduler, TaskSchedulerBuilder};
pub use store::{ExecutionLogSink, MemoryExecutionLog, MemoryTaskStore, TaskStore};
pub use task::{
    ExecuteResult, PageRequest, PaginatedResult, ScheduledTask, TaskExecutionLog, TaskFilter,
    TaskPatch, TaskStatus,
};
pub use time_unit::TimeUnit;
