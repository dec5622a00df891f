use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::task::ScheduledTask;

/// State shared between a live job and the firings it dispatches.
#[derive(Debug)]
pub(crate) struct JobState {
    pub(crate) task: ScheduledTask,
    active: AtomicUsize,
    executions: AtomicU64,
    cancelled: AtomicBool,
}

impl JobState {
    pub(crate) fn new(task: ScheduledTask) -> Self {
        Self {
            task,
            active: AtomicUsize::new(0),
            executions: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire) > 0
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Mark an execution as started. With `exclusive`, fails while another
    /// execution of this job is in flight.
    pub(crate) fn begin(self: &Arc<Self>, exclusive: bool) -> Option<RunningGuard> {
        if exclusive {
            self.active
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .ok()?;
        } else {
            self.active.fetch_add(1, Ordering::AcqRel);
        }
        self.executions.fetch_add(1, Ordering::Relaxed);
        Some(RunningGuard(self.clone()))
    }
}

/// Clears the in-flight mark when the execution ends, including on panic.
pub(crate) struct RunningGuard(Arc<JobState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The scheduler's handle to one registered trigger.
#[derive(Debug)]
pub(crate) struct JobHandle {
    pub(crate) job_id: Uuid,
    pub(crate) state: Arc<JobState>,
}

impl JobHandle {
    pub(crate) fn snapshot(&self) -> JobSnapshot {
        let task = &self.state.task;
        JobSnapshot {
            task_id: task.id,
            task_name: task.task_name.clone(),
            cron_expression: task.cron_expression.clone(),
            job_id: self.job_id,
            running: self.state.is_running(),
            executions: self.state.executions.load(Ordering::Relaxed),
        }
    }
}

/// Read-only view of a live job, for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub task_id: i64,
    pub task_name: String,
    pub cron_expression: String,
    /// Trigger-clock job id.
    pub job_id: Uuid,
    /// An execution is in flight right now.
    pub running: bool,
    /// Firings dispatched since this job was registered.
    pub executions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<JobState> {
        Arc::new(JobState::new(ScheduledTask::new(1, "t", "* * * * *", "x")))
    }

    #[test]
    fn exclusive_begin_rejects_overlap() {
        let state = state();
        let guard = state.begin(true).expect("first run starts");
        assert!(state.is_running());
        assert!(state.begin(true).is_none());

        drop(guard);
        assert!(!state.is_running());
        assert!(state.begin(true).is_some());
        assert_eq!(state.executions.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn shared_begin_counts_concurrent_runs() {
        let state = state();
        let a = state.begin(false).unwrap();
        let b = state.begin(false).unwrap();
        drop(a);
        assert!(state.is_running());
        drop(b);
        assert!(!state.is_running());
    }
}
