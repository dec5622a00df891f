//! # Cadence - Dynamic Cron Scheduling for Persisted Tasks
//!
//! Cadence keeps a live cron schedule in sync with task definitions held in a
//! store. Tasks can be added, removed, updated, started, stopped and reloaded
//! at runtime without restarting the process, and each firing is dispatched
//! to an executor chosen by the task's `exec_type` / `task_type`.
//!
//! ## Features
//!
//! - **Cron expressions**: 5-field (minute precision) or 6-field (with seconds)
//! - **Runtime administration**: add, remove, update, start, stop and reload tasks
//! - **Pluggable executors**: register with `#[executor]` or at runtime
//! - **Execution log**: one entry per firing, success or failure with duration
//! - **Config support**: TOML or YAML files plus `CADENCE__` environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cadence::{executor, BoxError, ScheduledTask, TaskSchedulerBuilder};
//!
//! #[executor(exec_type = "cleanup")]
//! async fn cleanup(task: ScheduledTask) -> Result<(), BoxError> {
//!     println!("running {} with {}", task.task_name, task.task_params);
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = cadence::load_toml_config("config/application.toml")?;
//!
//!     let scheduler = TaskSchedulerBuilder::with_config(config)
//!         .register_all()
//!         .build()
//!         .await?;
//!     scheduler.start().await?;
//!
//!     // Runtime changes take effect immediately
//!     scheduler
//!         .add_task(ScheduledTask::new(7, "nightly-cleanup", "0 3 * * *", "cleanup"))
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     scheduler.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [scheduler]
//! execution_timeout = "5m"
//! skip_overlapping = true
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [[tasks]]
//! id = 1
//! task_name = "purge-sessions"
//! cron_expression = "0 */10 * * * *"
//! exec_type = "cleanup"
//! ```
//!
//! Any key can be overridden from the environment with the `CADENCE__`
//! prefix and `__` as the nesting separator:
//!
//! ```bash
//! export CADENCE__SCHEDULER__EXECUTION_TIMEOUT=30s
//! export CADENCE__LOGGING__FORMAT=json
//! ```

// Re-export macros
pub use cadence_macro::executor;

// Re-export core types
pub use cadence_runtime::{
    async_trait, load_toml_config, load_yaml_config, telemetry, AppConfig, BoxError, ConfigError,
    ErrorKind, ExecuteResult, ExecutionError, ExecutionLogSink, Executor, ExecutorFuture,
    ExecutorKey, ExecutorRegistry, JobSnapshot, LogFormat, LoggingSettings, MemoryExecutionLog,
    MemoryTaskStore, PageRequest, PaginatedResult, ScheduledTask, SchedulerError,
    SchedulerSettings, StoreError, TaskExecutionLog, TaskFilter, TaskPatch, TaskRunner,
    TaskScheduler, TaskSchedulerBuilder, TaskStatus, TaskStore, TimeUnit,
};

// Make cadence_runtime available for macro expansion
pub use cadence_runtime;

// Re-export commonly used types
pub use tokio_cron_scheduler::JobScheduler;
