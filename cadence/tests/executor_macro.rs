use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cadence::{
    executor, BoxError, ExecutionError, ExecutorKey, ExecutorRegistry, MemoryExecutionLog,
    MemoryTaskStore, ScheduledTask, TaskRunner,
};

static CLEANUPS: AtomicUsize = AtomicUsize::new(0);

#[executor(exec_type = "cleanup", task_type = "old_data")]
async fn clean_old_data(task: ScheduledTask) -> Result<(), BoxError> {
    assert_eq!(task.task_type, "old_data");
    CLEANUPS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

#[executor(exec_type = "report")]
async fn any_report(task: ScheduledTask) -> Result<(), std::io::Error> {
    if task.task_params["fail"] == true {
        return Err(std::io::Error::other("report backend offline"));
    }
    Ok(())
}

fn runner() -> (TaskRunner, Arc<MemoryExecutionLog>) {
    let log = Arc::new(MemoryExecutionLog::new());
    let runner = TaskRunner::new(
        ExecutorRegistry::with_registered(),
        Arc::new(MemoryTaskStore::new()),
        log.clone(),
    );
    (runner, log)
}

#[test]
fn annotated_functions_are_registered() {
    let registry = ExecutorRegistry::with_registered();

    assert!(registry.contains(&ExecutorKey::new("cleanup", "old_data")));
    assert!(registry.contains(&ExecutorKey::any("report")));
    assert!(!registry.contains(&ExecutorKey::any("cleanup")));
}

#[test]
fn empty_task_type_acts_as_wildcard() {
    let registry = ExecutorRegistry::with_registered();

    let daily = ScheduledTask::new(1, "daily", "0 0 * * *", "report").with_task_type("daily");
    let weekly = ScheduledTask::new(2, "weekly", "0 0 * * 1", "report").with_task_type("weekly");
    assert!(registry.lookup_for(&daily).is_ok());
    assert!(registry.lookup_for(&weekly).is_ok());

    let other = ScheduledTask::new(3, "other", "0 0 * * *", "cleanup").with_task_type("sessions");
    assert!(matches!(
        registry.lookup_for(&other),
        Err(ExecutionError::NoExecutor { .. })
    ));
}

#[tokio::test]
async fn registered_executor_runs_through_runner() {
    let (runner, log) = runner();
    let task = ScheduledTask::new(10, "purge", "*/5 * * * * *", "cleanup").with_task_type("old_data");

    let before = CLEANUPS.load(Ordering::SeqCst);
    runner.execute_task(&task).await.unwrap();

    assert_eq!(CLEANUPS.load(Ordering::SeqCst), before + 1);
    let entries = log.for_task(10);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_success());
}

#[tokio::test]
async fn executor_error_converts_into_failure_log() {
    let (runner, log) = runner();
    let task = ScheduledTask::new(11, "report", "0 * * * *", "report")
        .with_params(serde_json::json!({ "fail": true }));

    let err = runner.execute_task(&task).await.unwrap_err();

    assert!(matches!(err, ExecutionError::Failed(_)));
    let failures = log.failures_for(11);
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].error_message.as_deref(),
        Some("executor failed: report backend offline")
    );
}
