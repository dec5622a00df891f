use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteResult {
    Success,
    Failure,
}

/// Outcome of one task execution, as recorded by an execution log sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecutionLog {
    /// Assigned by the sink; `0` until stored.
    pub id: i64,
    pub task_id: i64,
    pub execute_time: DateTime<Utc>,
    pub execute_result: ExecuteResult,
    pub execute_duration_ms: u64,
    pub error_message: Option<String>,
}

impl TaskExecutionLog {
    pub fn success(task_id: i64, execute_time: DateTime<Utc>, execute_duration_ms: u64) -> Self {
        Self {
            id: 0,
            task_id,
            execute_time,
            execute_result: ExecuteResult::Success,
            execute_duration_ms,
            error_message: None,
        }
    }

    pub fn failure(
        task_id: i64,
        execute_time: DateTime<Utc>,
        execute_duration_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            task_id,
            execute_time,
            execute_result: ExecuteResult::Failure,
            execute_duration_ms,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.execute_result == ExecuteResult::Success
    }
}
