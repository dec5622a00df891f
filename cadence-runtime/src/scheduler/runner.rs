use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::handle::JobState;
use crate::error::ExecutionError;
use crate::executor::ExecutorRegistry;
use crate::store::{ExecutionLogSink, TaskStore};
use crate::task::{ScheduledTask, TaskExecutionLog, TaskPatch};

/// Runs one firing: executor dispatch, outcome logging and last-run
/// bookkeeping. Shared by every job closure registered on the trigger clock.
pub struct TaskRunner {
    executors: ExecutorRegistry,
    store: Arc<dyn TaskStore>,
    log_sink: Arc<dyn ExecutionLogSink>,
    timeout: Option<Duration>,
    skip_overlapping: bool,
}

impl TaskRunner {
    pub fn new(
        executors: ExecutorRegistry,
        store: Arc<dyn TaskStore>,
        log_sink: Arc<dyn ExecutionLogSink>,
    ) -> Self {
        Self {
            executors,
            store,
            log_sink,
            timeout: None,
            skip_overlapping: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_skip_overlapping(mut self, skip: bool) -> Self {
        self.skip_overlapping = skip;
        self
    }

    pub fn executors(&self) -> &ExecutorRegistry {
        &self.executors
    }

    /// Entry point for the trigger clock.
    pub(crate) async fn fire(&self, state: Arc<JobState>) {
        let task = &state.task;
        if state.is_cancelled() {
            debug!(task_id = task.id, "firing dropped, job was cancelled");
            return;
        }
        let Some(_running) = state.begin(self.skip_overlapping) else {
            warn!(
                task_id = task.id,
                task_name = %task.task_name,
                "previous execution still running, skipping this firing"
            );
            return;
        };
        // Outcome is already logged and recorded.
        let _ = self.execute_task(task).await;
    }

    /// Execute `task` once and record the outcome.
    ///
    /// Never panics and never fails the caller's loop: the returned error is
    /// informational. One entry is written to the execution log and
    /// `last_execute_time` is updated whether or not the executor succeeded.
    pub async fn execute_task(&self, task: &ScheduledTask) -> Result<(), ExecutionError> {
        info!(task_id = task.id, task_name = %task.task_name, "executing task");
        let execute_time = Utc::now();
        let started = Instant::now();

        let outcome = self.run_executor(task).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let entry = match &outcome {
            Ok(()) => {
                info!(
                    task_id = task.id,
                    task_name = %task.task_name,
                    duration_ms,
                    "task executed successfully"
                );
                TaskExecutionLog::success(task.id, execute_time, duration_ms)
            }
            Err(e) => {
                error!(
                    task_id = task.id,
                    task_name = %task.task_name,
                    duration_ms,
                    error = %e,
                    "task execution failed"
                );
                TaskExecutionLog::failure(task.id, execute_time, duration_ms, e.to_string())
            }
        };

        if let Err(e) = self.log_sink.create(entry).await {
            warn!(task_id = task.id, error = %e, "failed to write task execution log");
        }

        if let Err(e) = self
            .store
            .update(task.id, TaskPatch::last_executed(Utc::now()))
            .await
        {
            warn!(task_id = task.id, error = %e, "failed to update task execution time");
        }

        outcome
    }

    async fn run_executor(&self, task: &ScheduledTask) -> Result<(), ExecutionError> {
        let executor = self.executors.lookup_for(task)?;
        let owned = task.clone();
        let work = tokio::spawn(async move { executor.execute(&owned).await });
        let abort = work.abort_handle();

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Err(ExecutionError::TimedOut(limit));
                }
            },
            None => work.await,
        };

        match joined {
            Ok(result) => result.map_err(ExecutionError::Failed),
            Err(e) if e.is_panic() => Err(ExecutionError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(ExecutionError::Failed(Box::new(e))),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, StoreError};
    use crate::executor::ExecutorKey;
    use crate::store::{MemoryExecutionLog, MemoryTaskStore};
    use crate::task::ExecuteResult;
    use async_trait::async_trait;

    struct Fixture {
        store: Arc<MemoryTaskStore>,
        log: Arc<MemoryExecutionLog>,
        runner: TaskRunner,
    }

    fn fixture(executors: ExecutorRegistry) -> Fixture {
        let store = Arc::new(MemoryTaskStore::with_tasks([ScheduledTask::new(
            7,
            "purge",
            "*/5 * * * * *",
            "cleanup",
        )]));
        let log = Arc::new(MemoryExecutionLog::new());
        let runner = TaskRunner::new(executors, store.clone(), log.clone());
        Fixture { store, log, runner }
    }

    fn registry(f: fn(ScheduledTask) -> crate::executor::ExecutorFuture<'static>) -> ExecutorRegistry {
        let mut registry = ExecutorRegistry::new();
        registry.register_fn(ExecutorKey::any("cleanup"), f);
        registry
    }

    async fn task(store: &MemoryTaskStore) -> ScheduledTask {
        store.get_by_id(7).await.unwrap()
    }

    #[tokio::test]
    async fn success_is_logged_and_timestamped() {
        let fx = fixture(registry(|_| Box::pin(async { Ok(()) })));
        let before = Utc::now();

        fx.runner.execute_task(&task(&fx.store).await).await.unwrap();

        let entries = fx.log.for_task(7);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].execute_result, ExecuteResult::Success);
        assert!(entries[0].error_message.is_none());
        let last = task(&fx.store).await.last_execute_time.unwrap();
        assert!(last >= before);
    }

    #[tokio::test]
    async fn failure_is_recorded_not_propagated_to_store() {
        let fx = fixture(registry(|_| {
            Box::pin(async { Err::<(), BoxError>("disk full".into()) })
        }));

        let err = fx.runner.execute_task(&task(&fx.store).await).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Failed(_)));

        let failures = fx.log.failures_for(7);
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].error_message.as_deref(),
            Some("executor failed: disk full")
        );
        assert!(task(&fx.store).await.last_execute_time.is_some());
    }

    #[tokio::test]
    async fn missing_executor_fails_immediately() {
        let fx = fixture(ExecutorRegistry::new());

        let err = fx.runner.execute_task(&task(&fx.store).await).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NoExecutor { .. }));
        assert_eq!(fx.log.failures_for(7).len(), 1);
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let fx = fixture(registry(|_| Box::pin(async { panic!("executor blew up") })));

        let err = fx.runner.execute_task(&task(&fx.store).await).await.unwrap_err();
        match err {
            ExecutionError::Panicked(msg) => assert_eq!(msg, "executor blew up"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.log.failures_for(7).len(), 1);
    }

    #[tokio::test]
    async fn timeout_marks_failure() {
        let mut fx = fixture(registry(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
        }));
        fx.runner = fx.runner.with_timeout(Some(Duration::from_millis(50)));

        let err = fx.runner.execute_task(&task(&fx.store).await).await.unwrap_err();
        assert!(matches!(err, ExecutionError::TimedOut(d) if d == Duration::from_millis(50)));
        assert_eq!(fx.log.failures_for(7).len(), 1);
    }

    struct BrokenSink;

    #[async_trait]
    impl ExecutionLogSink for BrokenSink {
        async fn create(&self, _entry: TaskExecutionLog) -> Result<TaskExecutionLog, StoreError> {
            Err(StoreError::Backend("log table missing".into()))
        }
    }

    #[tokio::test]
    async fn sink_failure_does_not_block_bookkeeping() {
        let store = Arc::new(MemoryTaskStore::with_tasks([ScheduledTask::new(
            7,
            "purge",
            "*/5 * * * * *",
            "cleanup",
        )]));
        let runner = TaskRunner::new(
            registry(|_| Box::pin(async { Ok(()) })),
            store.clone(),
            Arc::new(BrokenSink),
        );

        runner.execute_task(&task(&store).await).await.unwrap();
        assert!(task(&store).await.last_execute_time.is_some());
    }

    #[tokio::test]
    async fn overlapping_firing_is_skipped() {
        let fx = fixture(registry(|_| Box::pin(async { Ok(()) })));
        let state = Arc::new(JobState::new(task(&fx.store).await));
        let _busy = state.begin(true).unwrap();

        fx.runner.fire(state.clone()).await;
        assert!(fx.log.is_empty());

        state.cancel();
        drop(_busy);
        fx.runner.fire(state).await;
        assert!(fx.log.is_empty());
    }
}
