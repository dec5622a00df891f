use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use super::cron;
use super::handle::{JobHandle, JobSnapshot, JobState};
use super::runner::TaskRunner;
use crate::error::{Result, SchedulerError, StoreError};
use crate::store::TaskStore;
use crate::task::{ScheduledTask, TaskFilter};

/// Live cron scheduler for task definitions held in a [`TaskStore`].
///
/// Owns one trigger clock and the `task id -> job` map. Every mutation holds
/// the map's write lock for its whole duration, including the trigger-clock
/// add/remove calls, so operations on the same task id never interleave.
/// Executions run in their own Tokio tasks and never take the lock.
///
/// Build one with [`TaskSchedulerBuilder`](super::TaskSchedulerBuilder).
pub struct TaskScheduler {
    clock: JobScheduler,
    jobs: RwLock<HashMap<i64, JobHandle>>,
    runner: Arc<TaskRunner>,
    store: Arc<dyn TaskStore>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl TaskScheduler {
    pub(crate) fn new(clock: JobScheduler, runner: TaskRunner, store: Arc<dyn TaskStore>) -> Self {
        Self {
            clock,
            jobs: RwLock::new(HashMap::new()),
            runner: Arc::new(runner),
            store,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// The execution wrapper the trigger clock drives.
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Load every enabled task from the store and start the trigger clock.
    ///
    /// Tasks with an invalid cron expression are logged and skipped. Returns
    /// the number of tasks scheduled. Calling it again re-loads without
    /// restarting the clock.
    pub async fn start(&self) -> Result<usize> {
        self.ensure_running()?;
        let tasks = self.load_enabled().await?;
        let scheduled = {
            let mut jobs = self.jobs.write().await;
            self.schedule_all_locked(&mut jobs, tasks).await
        };

        if !self.started.swap(true, Ordering::AcqRel) {
            if let Err(e) = self.clock.start().await {
                self.started.store(false, Ordering::Release);
                error!(error = %e, "failed to start trigger clock");
                self.cancel_all_locked(&mut *self.jobs.write().await).await;
                return Err(e.into());
            }
        }
        info!(tasks = scheduled, "task scheduler started");
        Ok(scheduled)
    }

    /// Halt the trigger clock. In-flight executions run to completion; no new
    /// firings happen. The scheduler cannot be started again.
    pub async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut clock = self.clock.clone();
        clock.shutdown().await?;
        for handle in self.jobs.read().await.values() {
            handle.state.cancel();
        }
        info!("task scheduler stopped");
        Ok(())
    }

    /// Schedule `task`, replacing any live job for its id. A disabled task
    /// only has its existing job (if any) cancelled.
    pub async fn add_task(&self, task: ScheduledTask) -> Result<()> {
        self.ensure_running()?;
        let mut jobs = self.jobs.write().await;
        self.cancel_locked(&mut jobs, task.id).await;
        self.add_locked(&mut jobs, task).await
    }

    /// Cancel the live job for `id`. Absent ids are not an error.
    pub async fn remove_task(&self, id: i64) -> Result<()> {
        self.ensure_running()?;
        let mut jobs = self.jobs.write().await;
        self.cancel_locked(&mut jobs, id).await;
        info!(task_id = id, "task removed");
        Ok(())
    }

    /// Re-derive the live job for `task.id` from `task`.
    pub async fn update_task(&self, task: ScheduledTask) -> Result<()> {
        self.ensure_running()?;
        let mut jobs = self.jobs.write().await;
        self.cancel_locked(&mut jobs, task.id).await;
        let id = task.id;
        self.add_locked(&mut jobs, task).await?;
        info!(task_id = id, "task updated");
        Ok(())
    }

    /// Re-fetch `id` from the store and schedule it.
    ///
    /// Fails with [`SchedulerError::TaskDisabled`] when the store holds the
    /// task as disabled; any stale job for the id is cancelled in that case.
    pub async fn start_task(&self, id: i64) -> Result<()> {
        self.ensure_running()?;
        let task = match self.store.get_by_id(id).await {
            Ok(task) => task,
            Err(StoreError::NotFound(_)) => {
                warn!(task_id = id, "cannot start task missing from store");
                return Err(SchedulerError::TaskNotFound { id });
            }
            Err(e) => {
                error!(task_id = id, error = %e, "failed to get task by id");
                return Err(e.into());
            }
        };

        let mut jobs = self.jobs.write().await;
        self.cancel_locked(&mut jobs, id).await;
        if !task.is_enabled() {
            warn!(task_id = id, "task is not enabled, cannot start");
            return Err(SchedulerError::TaskDisabled { id });
        }
        self.schedule_locked(&mut jobs, task).await
    }

    /// Cancel the live job for `id`; [`SchedulerError::NotScheduled`] if none.
    pub async fn stop_task(&self, id: i64) -> Result<()> {
        self.ensure_running()?;
        let mut jobs = self.jobs.write().await;
        if !self.cancel_locked(&mut jobs, id).await {
            warn!(task_id = id, "task not found");
            return Err(SchedulerError::NotScheduled { id });
        }
        info!(task_id = id, "task stopped");
        Ok(())
    }

    /// Drop every live job and load the enabled set from the store again.
    ///
    /// The store is queried first: if that fails the current jobs are kept.
    pub async fn reload_tasks(&self) -> Result<usize> {
        self.ensure_running()?;
        info!("reloading all tasks");
        let tasks = self.load_enabled().await?;

        let mut jobs = self.jobs.write().await;
        self.cancel_all_locked(&mut jobs).await;
        info!("all tasks stopped");

        let scheduled = self.schedule_all_locked(&mut jobs, tasks).await;
        info!(tasks = scheduled, "tasks reloaded successfully");
        Ok(scheduled)
    }

    /// `None` when `id` has no live job.
    pub async fn get_task_status(&self, id: i64) -> Option<JobSnapshot> {
        self.jobs.read().await.get(&id).map(JobHandle::snapshot)
    }

    /// Every live job, ordered by task id.
    pub async fn list_all_tasks(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self
            .jobs
            .read()
            .await
            .values()
            .map(JobHandle::snapshot)
            .collect();
        snapshots.sort_by_key(|s| s.task_id);
        snapshots
    }

    pub async fn is_scheduled(&self, id: i64) -> bool {
        self.jobs.read().await.contains_key(&id)
    }

    /// Next time the trigger clock will fire `id`, if it is scheduled.
    pub async fn next_fire_time(&self, id: i64) -> Result<Option<DateTime<Utc>>> {
        let job_id = match self.jobs.read().await.get(&id) {
            Some(handle) => handle.job_id,
            None => return Ok(None),
        };
        let mut clock = self.clock.clone();
        Ok(clock.next_tick_for_job(job_id).await?)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SchedulerError::Stopped);
        }
        Ok(())
    }

    async fn load_enabled(&self) -> Result<Vec<ScheduledTask>> {
        let result = self
            .store
            .search_paginated(&TaskFilter::enabled())
            .await
            .map_err(|e| {
                error!(error = %e, "failed to load tasks");
                e
            })?;
        Ok(result.data)
    }

    async fn schedule_all_locked(
        &self,
        jobs: &mut HashMap<i64, JobHandle>,
        tasks: Vec<ScheduledTask>,
    ) -> usize {
        let mut scheduled = 0;
        for task in tasks.into_iter().filter(ScheduledTask::is_enabled) {
            self.cancel_locked(jobs, task.id).await;
            // Already logged with task context.
            if self.schedule_locked(jobs, task).await.is_ok() {
                scheduled += 1;
            }
        }
        scheduled
    }

    async fn add_locked(&self, jobs: &mut HashMap<i64, JobHandle>, task: ScheduledTask) -> Result<()> {
        if !task.is_enabled() {
            info!(task_id = task.id, "task added but not scheduled (disabled)");
            return Ok(());
        }
        self.schedule_locked(jobs, task).await
    }

    /// Register a trigger for `task`. The caller must have cancelled any
    /// existing job for the id.
    async fn schedule_locked(
        &self,
        jobs: &mut HashMap<i64, JobHandle>,
        task: ScheduledTask,
    ) -> Result<()> {
        let (task_id, task_name, cron_expression) =
            (task.id, task.task_name.clone(), task.cron_expression.clone());

        let registered = self.register_trigger(task).await;
        match registered {
            Ok(handle) => {
                info!(
                    task_id,
                    task_name = %task_name,
                    cron = %cron_expression,
                    job_id = %handle.job_id,
                    "task scheduled"
                );
                jobs.insert(task_id, handle);
                Ok(())
            }
            Err(e) => {
                error!(task_id, task_name = %task_name, error = %e, "failed to schedule task");
                Err(e)
            }
        }
    }

    async fn register_trigger(&self, task: ScheduledTask) -> Result<JobHandle> {
        let expression = cron::normalize(&task)?;
        let (task_id, original) = (task.id, task.cron_expression.clone());
        let state = Arc::new(JobState::new(task));

        let runner = self.runner.clone();
        let job_state = state.clone();
        let job = Job::new_async(expression.as_str(), move |_uuid, _lock| {
            let runner = runner.clone();
            let state = job_state.clone();
            Box::pin(async move {
                runner.fire(state).await;
            })
        })
        .map_err(|e| SchedulerError::InvalidCron {
            task_id,
            expression: original,
            reason: e.to_string(),
        })?;

        let job_id = self.clock.add(job).await?;
        Ok(JobHandle { job_id, state })
    }

    async fn cancel_all_locked(&self, jobs: &mut HashMap<i64, JobHandle>) {
        let ids: Vec<i64> = jobs.keys().copied().collect();
        for id in ids {
            self.cancel_locked(jobs, id).await;
        }
    }

    /// Unregister and forget the job for `id`. Returns whether one existed.
    async fn cancel_locked(&self, jobs: &mut HashMap<i64, JobHandle>, id: i64) -> bool {
        let Some(handle) = jobs.remove(&id) else {
            return false;
        };
        handle.state.cancel();
        if let Err(e) = self.clock.remove(&handle.job_id).await {
            warn!(task_id = id, job_id = %handle.job_id, error = %e, "failed to unregister trigger");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TaskSchedulerBuilder;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_all_unregisters_every_job() {
        let scheduler = TaskSchedulerBuilder::new().build().await.unwrap();
        for id in 1..=3 {
            scheduler
                .add_task(ScheduledTask::new(id, format!("task-{id}"), "0 0 * * * *", "cleanup"))
                .await
                .unwrap();
        }
        let states: Vec<Arc<JobState>> = scheduler
            .jobs
            .read()
            .await
            .values()
            .map(|handle| handle.state.clone())
            .collect();
        assert_eq!(states.len(), 3);

        scheduler
            .cancel_all_locked(&mut *scheduler.jobs.write().await)
            .await;

        assert!(scheduler.list_all_tasks().await.is_empty());
        assert!(states.iter().all(|state| state.is_cancelled()));
    }
}
