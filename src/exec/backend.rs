// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work itself.
//! This makes it easy to swap in a fake executor in tests.
//!
//! - `PoolExecutorBackend` is the default implementation. Each task gets a
//!   Tokio task that waits for a pool permit and then runs the instance on
//!   the blocking thread pool.
//! - Tests can provide their own `ExecutorBackend` that, for example, runs
//!   tasks inline and records the order they were dispatched in.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::schedule::ScheduledTask;

use super::task_runner::run_task;

/// Trait abstracting how scheduled tasks are executed.
///
/// Implementations must eventually send exactly one `TaskCompleted` per
/// dispatched task, or the run never quiesces.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Worker pool backend, optionally bounded.
pub struct PoolExecutorBackend {
    tx: mpsc::Sender<RuntimeEvent>,
    permits: Option<Arc<Semaphore>>,
}

impl PoolExecutorBackend {
    /// `max_concurrency = None` runs every ready task at once.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, max_concurrency: Option<usize>) -> Self {
        let permits = max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));
        Self {
            tx: runtime_tx,
            permits,
        }
    }
}

impl ExecutorBackend for PoolExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();
        let permits = self.permits.clone();

        Box::pin(async move {
            for task in tasks {
                debug!(task = %task.id, "handing task to worker pool");
                tokio::spawn(run_task(task, tx.clone(), permits.clone()));
            }
            Ok(())
        })
    }
}
