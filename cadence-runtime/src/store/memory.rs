use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::{ExecutionLogSink, TaskStore};
use crate::error::StoreError;
use crate::task::{
    ExecuteResult, PaginatedResult, ScheduledTask, TaskExecutionLog, TaskFilter, TaskPatch,
};

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

/// Task definitions held in a `BTreeMap` keyed by id.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<BTreeMap<i64, ScheduledTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: impl IntoIterator<Item = ScheduledTask>) -> Self {
        let store = Self::new();
        for task in tasks {
            // A fresh lock cannot be poisoned.
            let _ = store.insert(task);
        }
        store
    }

    /// Insert or replace a definition, stamping `created_at`/`updated_at`.
    /// Returns the previous definition for the id.
    pub fn insert(&self, mut task: ScheduledTask) -> Result<Option<ScheduledTask>, StoreError> {
        let now = Utc::now();
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        task.created_at = tasks
            .get(&task.id)
            .and_then(|existing| existing.created_at)
            .or(task.created_at)
            .or(Some(now));
        task.updated_at = Some(now);
        Ok(tasks.insert(task.id, task))
    }

    pub fn delete(&self, id: i64) -> Result<Option<ScheduledTask>, StoreError> {
        Ok(self.tasks.write().map_err(poisoned)?.remove(&id))
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn search_paginated(
        &self,
        filter: &TaskFilter,
    ) -> Result<PaginatedResult<ScheduledTask>, StoreError> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        let matches: Vec<ScheduledTask> = tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        let total = matches.len();

        Ok(match filter.page {
            Some(page) => {
                let page_size = page.page_size.max(1);
                let page_no = page.page.max(1);
                let data = matches
                    .into_iter()
                    .skip((page_no - 1).saturating_mul(page_size))
                    .take(page_size)
                    .collect();
                PaginatedResult {
                    data,
                    total,
                    page: page_no,
                    page_size,
                }
            }
            None => PaginatedResult {
                data: matches,
                total,
                page: 1,
                page_size: total,
            },
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<ScheduledTask, StoreError> {
        self.tasks
            .read()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> Result<ScheduledTask, StoreError> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply(task);
        task.updated_at = Some(Utc::now());
        Ok(task.clone())
    }
}

/// Execution log entries kept in insertion order.
#[derive(Debug)]
pub struct MemoryExecutionLog {
    entries: RwLock<Vec<TaskExecutionLog>>,
    next_id: AtomicI64,
}

impl Default for MemoryExecutionLog {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry. Reads through a poisoned lock, since entries
    /// are only ever appended or removed whole.
    pub fn entries(&self) -> Vec<TaskExecutionLog> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn for_task(&self, task_id: i64) -> Vec<TaskExecutionLog> {
        self.filtered(|entry| entry.task_id == task_id)
    }

    pub fn failures_for(&self, task_id: i64) -> Vec<TaskExecutionLog> {
        self.filtered(|entry| {
            entry.task_id == task_id && entry.execute_result == ExecuteResult::Failure
        })
    }

    /// Delete entries by log id; returns how many were removed.
    pub fn delete(&self, ids: &[i64]) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let before = entries.len();
        entries.retain(|entry| !ids.contains(&entry.id));
        Ok(before - entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filtered(&self, keep: impl Fn(&TaskExecutionLog) -> bool) -> Vec<TaskExecutionLog> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ExecutionLogSink for MemoryExecutionLog {
    async fn create(&self, mut entry: TaskExecutionLog) -> Result<TaskExecutionLog, StoreError> {
        entry.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().map_err(poisoned)?.push(entry.clone());
        Ok(entry)
    }
}
