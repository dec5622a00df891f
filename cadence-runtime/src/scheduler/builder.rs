use std::future::Future;
use std::sync::Arc;

use tokio_cron_scheduler::JobScheduler;
use tracing::info;

use super::engine::TaskScheduler;
use super::runner::TaskRunner;
use crate::config::{AppConfig, SchedulerSettings};
use crate::error::{BoxError, Result};
use crate::executor::{Executor, ExecutorKey, ExecutorRegistry};
use crate::store::{ExecutionLogSink, MemoryExecutionLog, MemoryTaskStore, TaskStore};
use crate::task::ScheduledTask;

/// Builder for the scheduler
pub struct TaskSchedulerBuilder {
    settings: SchedulerSettings,
    seed_tasks: Vec<ScheduledTask>,
    store: Option<Arc<dyn TaskStore>>,
    log_sink: Option<Arc<dyn ExecutionLogSink>>,
    executors: ExecutorRegistry,
}

impl Default for TaskSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSchedulerBuilder {
    /// Create a new builder with default settings and no executors
    pub fn new() -> Self {
        Self {
            settings: SchedulerSettings::default(),
            seed_tasks: Vec::new(),
            store: None,
            log_sink: None,
            executors: ExecutorRegistry::new(),
        }
    }

    /// Create from loaded configuration.
    ///
    /// `config.tasks` seed an in-memory store, used only if no store is set
    /// explicitly with [`store`](Self::store).
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            settings: config.scheduler,
            seed_tasks: config.tasks,
            ..Self::new()
        }
    }

    pub fn settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn log_sink(mut self, log_sink: Arc<dyn ExecutionLogSink>) -> Self {
        self.log_sink = Some(log_sink);
        self
    }

    /// Replace the executor registry wholesale.
    pub fn executors(mut self, executors: ExecutorRegistry) -> Self {
        self.executors = executors;
        self
    }

    pub fn register<E>(mut self, key: ExecutorKey, executor: E) -> Self
    where
        E: Executor + 'static,
    {
        self.executors.register(key, executor);
        self
    }

    pub fn register_fn<F, Fut>(mut self, key: ExecutorKey, f: F) -> Self
    where
        F: Fn(ScheduledTask) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.executors.register_fn(key, f);
        self
    }

    /// Register every function annotated with `#[executor]`
    pub fn register_all(mut self) -> Self {
        self.executors.register_linked();
        self
    }

    /// Build the scheduler (does not start it yet)
    ///
    /// Creates the trigger clock; fails if the execution timeout setting is
    /// malformed or the clock cannot be created.
    pub async fn build(self) -> Result<TaskScheduler> {
        let timeout = self.settings.execution_timeout()?;

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryTaskStore::with_tasks(self.seed_tasks)) as Arc<dyn TaskStore>,
        };
        let log_sink = self
            .log_sink
            .unwrap_or_else(|| Arc::new(MemoryExecutionLog::new()) as Arc<dyn ExecutionLogSink>);

        info!(
            executors = self.executors.len(),
            skip_overlapping = self.settings.skip_overlapping,
            timeout = ?timeout,
            "Building task scheduler"
        );

        let runner = TaskRunner::new(self.executors, store.clone(), log_sink)
            .with_timeout(timeout)
            .with_skip_overlapping(self.settings.skip_overlapping);
        let clock = JobScheduler::new().await?;

        Ok(TaskScheduler::new(clock, runner, store))
    }
}
