use std::sync::Arc;

use cadence::telemetry::init_tracing;
use cadence::{
    executor, load_toml_config, BoxError, MemoryExecutionLog, MemoryTaskStore, ScheduledTask,
    TaskSchedulerBuilder, TaskStatus, TaskStore,
};
use chrono::Local;

/// Cleanup tasks of any task_type
#[executor(exec_type = "cleanup")]
async fn cleanup(task: ScheduledTask) -> Result<(), BoxError> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    println!(
        "[{}] [CLEANUP] {} ({}) params={}",
        now, task.task_name, task.task_type, task.task_params
    );
    Ok(())
}

/// Reports fail on purpose so the execution log shows both outcomes
#[executor(exec_type = "report", task_type = "daily")]
async fn daily_report(task: ScheduledTask) -> Result<(), BoxError> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    println!("[{}] [REPORT] {}", now, task.task_name);
    Err(format!("report sink for {} is not configured", task.task_name).into())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = load_toml_config("demos/config/application.toml")?;
    init_tracing(&config.logging)?;

    println!("🚀 Starting admin scheduler demo...\n");

    let store = Arc::new(MemoryTaskStore::with_tasks(config.tasks.clone()));
    let log = Arc::new(MemoryExecutionLog::new());

    let scheduler = TaskSchedulerBuilder::with_config(config)
        .store(store.clone())
        .log_sink(log.clone())
        .register_all()
        .build()
        .await?;

    let scheduled = scheduler.start().await?;
    println!("✅ {} enabled task(s) scheduled", scheduled);

    // Add a task at runtime, store first so start_task/reload see it too
    let compact = ScheduledTask::new(7, "compact-logs", "*/5 * * * * *", "cleanup")
        .with_task_type("logs")
        .with_description("Compact old execution logs");
    store.insert(compact.clone())?;
    scheduler.add_task(compact).await?;

    // Enabling the legacy task in the store and starting it picks up the change
    if let Ok(legacy) = store.get_by_id(3).await {
        store.insert(legacy.with_status(TaskStatus::Enabled))?;
        scheduler.start_task(3).await?;
    }

    for snapshot in scheduler.list_all_tasks().await {
        let next = scheduler.next_fire_time(snapshot.task_id).await?;
        println!(
            "   - #{} {} [{}] next: {}",
            snapshot.task_id,
            snapshot.task_name,
            snapshot.cron_expression,
            next.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\n✅ Press Ctrl+C to stop.\n");
    tokio::signal::ctrl_c().await?;

    println!("\n👋 Shutting down...");
    scheduler.stop().await?;

    let failures = log.entries().iter().filter(|e| !e.is_success()).count();
    println!("📝 {} execution(s) logged, {} failed", log.len(), failures);
    Ok(())
}

