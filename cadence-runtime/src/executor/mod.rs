mod registration;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::error::{BoxError, ExecutionError};
use crate::task::ScheduledTask;

pub use registration::{ExecutorRegistration, EXECUTORS};

/// Future returned by [`Executor::execute`].
pub type ExecutorFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;

/// Performs the work for one execution kind.
///
/// # Example
///
/// ```rust
/// use cadence_runtime::{Executor, ExecutorFuture, ScheduledTask};
///
/// struct Purge;
///
/// impl Executor for Purge {
///     fn execute<'a>(&'a self, task: &'a ScheduledTask) -> ExecutorFuture<'a> {
///         Box::pin(async move {
///             println!("purging for {}", task.task_name);
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Executor: Send + Sync {
    fn execute<'a>(&'a self, task: &'a ScheduledTask) -> ExecutorFuture<'a>;
}

/// Adapts an async closure taking an owned task into an [`Executor`].
pub struct FnExecutor<F>(F);

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(ScheduledTask) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn execute<'a>(&'a self, task: &'a ScheduledTask) -> ExecutorFuture<'a> {
        Box::pin((self.0)(task.clone()))
    }
}

/// Dispatch key. A `task_type` of `None` matches every task type of the
/// `exec_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutorKey {
    pub exec_type: String,
    pub task_type: Option<String>,
}

impl ExecutorKey {
    pub fn new(exec_type: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            exec_type: exec_type.into(),
            task_type: Some(task_type.into()),
        }
    }

    pub fn any(exec_type: impl Into<String>) -> Self {
        Self {
            exec_type: exec_type.into(),
            task_type: None,
        }
    }

    fn from_static(exec_type: &str, task_type: &str) -> Self {
        if task_type.is_empty() {
            Self::any(exec_type)
        } else {
            Self::new(exec_type, task_type)
        }
    }
}

impl fmt::Display for ExecutorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task_type {
            Some(task_type) => write!(f, "{}/{}", self.exec_type, task_type),
            None => write!(f, "{}/*", self.exec_type),
        }
    }
}

/// Maps execution kinds to executors.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<ExecutorKey, Arc<dyn Executor>>,
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every `#[executor]` function linked into
    /// the binary.
    pub fn with_registered() -> Self {
        let mut registry = Self::new();
        registry.register_linked();
        registry
    }

    /// Add all `#[executor]` functions. Returns how many were added.
    pub fn register_linked(&mut self) -> usize {
        let mut added = 0;
        for entry in EXECUTORS.iter().map(|f| f()) {
            let key = ExecutorKey::from_static(entry.exec_type, entry.task_type);
            debug!(executor = entry.name, key = %key, "registering linked executor");
            self.register(key, FnExecutor::new(entry.handler));
            added += 1;
        }
        added
    }

    /// Register an executor, returning the one it replaced.
    pub fn register<E>(&mut self, key: ExecutorKey, executor: E) -> Option<Arc<dyn Executor>>
    where
        E: Executor + 'static,
    {
        self.executors.insert(key, Arc::new(executor))
    }

    pub fn register_fn<F, Fut>(&mut self, key: ExecutorKey, f: F) -> Option<Arc<dyn Executor>>
    where
        F: Fn(ScheduledTask) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.register(key, FnExecutor::new(f))
    }

    pub fn unregister(&mut self, key: &ExecutorKey) -> Option<Arc<dyn Executor>> {
        self.executors.remove(key)
    }

    /// Exact `(exec_type, task_type)` match first, then the `exec_type` wildcard.
    pub fn lookup(
        &self,
        exec_type: &str,
        task_type: &str,
    ) -> Result<Arc<dyn Executor>, ExecutionError> {
        self.executors
            .get(&ExecutorKey::new(exec_type, task_type))
            .or_else(|| self.executors.get(&ExecutorKey::any(exec_type)))
            .cloned()
            .ok_or_else(|| ExecutionError::NoExecutor {
                exec_type: exec_type.to_string(),
                task_type: task_type.to_string(),
            })
    }

    pub fn lookup_for(&self, task: &ScheduledTask) -> Result<Arc<dyn Executor>, ExecutionError> {
        self.lookup(&task.exec_type, &task.task_type)
    }

    pub fn contains(&self, key: &ExecutorKey) -> bool {
        self.executors.contains_key(key)
    }

    pub fn keys(&self) -> Vec<ExecutorKey> {
        let mut keys: Vec<_> = self.executors.keys().cloned().collect();
        keys.sort_by(|a, b| {
            (&a.exec_type, &a.task_type).cmp(&(&b.exec_type, &b.task_type))
        });
        keys
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}
