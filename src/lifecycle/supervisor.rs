//! Background Task Supervisor.
//!
//! # Responsibilities
//! - Hold a module's auxiliary tasks in registration order
//! - Start them before the listener binds, stop them after it closes
//!
//! # Design Decisions
//! - Start is best-effort: a failing task is logged and skipped, tasks that
//!   already started keep running
//! - Only tasks that started are stopped, in reverse registration order
//! - Stop failures are logged and never interrupt the remaining stops

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

/// Error type for hooks and background tasks.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Auxiliary work that lives as long as its module runs.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), BoxError>;

    async fn stop(&self) -> Result<(), BoxError>;
}

pub struct TaskSupervisor {
    module: Arc<str>,
    tasks: Vec<Arc<dyn BackgroundTask>>,
    started: Vec<usize>,
}

impl TaskSupervisor {
    pub fn new(module: impl Into<Arc<str>>) -> Self {
        Self {
            module: module.into(),
            tasks: Vec::new(),
            started: Vec::new(),
        }
    }

    pub fn register(&mut self, task: Arc<dyn BackgroundTask>) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Names of tasks currently started, in start order.
    pub fn started(&self) -> Vec<&str> {
        self.started.iter().map(|&i| self.tasks[i].name()).collect()
    }

    /// Start every registered task in order. Returns how many started.
    pub async fn start_all(&mut self) -> usize {
        for (index, task) in self.tasks.iter().enumerate() {
            if self.started.contains(&index) {
                continue;
            }
            match task.start().await {
                Ok(()) => {
                    tracing::info!(module = %self.module, task = %task.name(), "Background task started");
                    self.started.push(index);
                }
                Err(e) => {
                    tracing::error!(
                        module = %self.module,
                        task = %task.name(),
                        error = %e,
                        "Background task failed to start, continuing without it"
                    );
                }
            }
        }
        self.started.len()
    }

    /// Stop every started task in reverse order.
    pub async fn stop_all(&mut self) {
        while let Some(index) = self.started.pop() {
            let task = &self.tasks[index];
            match task.stop().await {
                Ok(()) => {
                    tracing::info!(module = %self.module, task = %task.name(), "Background task stopped");
                }
                Err(e) => {
                    tracing::error!(
                        module = %self.module,
                        task = %task.name(),
                        error = %e,
                        "Background task failed to stop"
                    );
                }
            }
        }
    }
}
