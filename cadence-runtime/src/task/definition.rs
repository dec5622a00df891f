use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a task definition should be live-scheduled.
///
/// Serialized as `"enabled"`/`"disabled"`; deserializing also accepts the
/// `1`/`0` flags, as integers or strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawStatus")]
pub enum TaskStatus {
    #[default]
    Enabled,
    Disabled,
}

impl TaskStatus {
    pub fn is_enabled(self) -> bool {
        self == TaskStatus::Enabled
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Enabled => "enabled",
            TaskStatus::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    /// Accepts the status words as well as the numeric `1`/`0` flags used by
    /// admin databases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enabled" | "1" => Ok(TaskStatus::Enabled),
            "disabled" | "0" => Ok(TaskStatus::Disabled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Flag(i64),
    Text(String),
}

impl TryFrom<RawStatus> for TaskStatus {
    type Error = String;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw {
            RawStatus::Flag(1) => Ok(TaskStatus::Enabled),
            RawStatus::Flag(0) => Ok(TaskStatus::Disabled),
            RawStatus::Flag(other) => Err(format!("unknown task status flag: {other}")),
            RawStatus::Text(text) => text.parse(),
        }
    }
}

/// A persisted task definition.
///
/// The scheduler never creates or deletes these; it only mirrors the enabled
/// ones as live jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub task_name: String,
    #[serde(default)]
    pub task_description: String,
    /// Five- or six-field cron expression.
    pub cron_expression: String,
    pub exec_type: String,
    #[serde(default)]
    pub task_type: String,
    /// Opaque payload handed to the executor.
    #[serde(default)]
    pub task_params: serde_json::Value,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub last_execute_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScheduledTask {
    /// Create an enabled definition with empty description, task type and params.
    pub fn new(
        id: i64,
        task_name: impl Into<String>,
        cron_expression: impl Into<String>,
        exec_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            task_name: task_name.into(),
            task_description: String::new(),
            cron_expression: cron_expression.into(),
            exec_type: exec_type.into(),
            task_type: String::new(),
            task_params: serde_json::Value::Null,
            status: TaskStatus::Enabled,
            last_execute_time: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.task_description = description.into();
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.task_params = params;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn disabled(self) -> Self {
        self.with_status(TaskStatus::Disabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }
}

/// Partial update of a task definition. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub task_name: Option<String>,
    pub task_description: Option<String>,
    pub cron_expression: Option<String>,
    pub exec_type: Option<String>,
    pub task_type: Option<String>,
    pub task_params: Option<serde_json::Value>,
    pub status: Option<TaskStatus>,
    pub last_execute_time: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// The patch written back after every attempted execution.
    pub fn last_executed(at: DateTime<Utc>) -> Self {
        Self {
            last_execute_time: Some(at),
            ..Self::default()
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, task: &mut ScheduledTask) {
        if let Some(v) = self.task_name {
            task.task_name = v;
        }
        if let Some(v) = self.task_description {
            task.task_description = v;
        }
        if let Some(v) = self.cron_expression {
            task.cron_expression = v;
        }
        if let Some(v) = self.exec_type {
            task.exec_type = v;
        }
        if let Some(v) = self.task_type {
            task.task_type = v;
        }
        if let Some(v) = self.task_params {
            task.task_params = v;
        }
        if let Some(v) = self.status {
            task.status = v;
        }
        if let Some(v) = self.last_execute_time {
            task.last_execute_time = Some(v);
        }
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

/// Query filters understood by a task store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub exec_type: Option<String>,
    /// Case-insensitive substring match on `task_name`.
    pub name_contains: Option<String>,
    /// `None` returns every match in a single result.
    pub page: Option<PageRequest>,
}

impl TaskFilter {
    /// Every enabled definition, unpaginated. This is what the scheduler loads.
    pub fn enabled() -> Self {
        Self {
            status: Some(TaskStatus::Enabled),
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &ScheduledTask) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if let Some(exec_type) = &self.exec_type {
            if &task.exec_type != exec_type {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !task
                .task_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    /// Number of matches before pagination.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}
