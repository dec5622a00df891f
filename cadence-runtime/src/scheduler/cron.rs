use crate::error::SchedulerError;
use crate::task::ScheduledTask;

/// Bring a task's cron expression into the six-field (seconds first) form the
/// trigger clock expects.
///
/// Five-field expressions fire at second `0`. Any other field count is
/// rejected here; syntax inside the fields is checked by the trigger clock.
pub(crate) fn normalize(task: &ScheduledTask) -> Result<String, SchedulerError> {
    let fields: Vec<&str> = task.cron_expression.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 => Ok(fields.join(" ")),
        n => Err(SchedulerError::InvalidCron {
            task_id: task.id,
            expression: task.cron_expression.clone(),
            reason: format!("expected 5 or 6 fields, found {n}"),
        }),
    }
}
