//! Collaborator interfaces the scheduler consumes, plus in-memory
//! implementations for embedding and tests.

mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::task::{PaginatedResult, ScheduledTask, TaskExecutionLog, TaskFilter, TaskPatch};

pub use memory::{MemoryExecutionLog, MemoryTaskStore};

/// Source of truth for task definitions.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Query definitions. With `filter.page == None` every match is returned.
    async fn search_paginated(
        &self,
        filter: &TaskFilter,
    ) -> Result<PaginatedResult<ScheduledTask>, StoreError>;

    /// Fetch one definition; [`StoreError::NotFound`] when absent.
    async fn get_by_id(&self, id: i64) -> Result<ScheduledTask, StoreError>;

    /// Apply a partial update and return the updated definition.
    async fn update(&self, id: i64, patch: TaskPatch) -> Result<ScheduledTask, StoreError>;
}

/// Receives one entry per execution.
#[async_trait]
pub trait ExecutionLogSink: Send + Sync {
    async fn create(&self, entry: TaskExecutionLog) -> Result<TaskExecutionLog, StoreError>;
}
