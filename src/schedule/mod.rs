// src/schedule/mod.rs

//! Executable schedules.
//!
//! - [`Schedule`] is what a successful build produces: one instance per
//!   declared task plus the resolved dependencies between them.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready, what inputs they get, and when the run is over.
//! - [`task_info`] provides run states and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.
//! - [`report`] holds the outcome of a run.
//! - [`plan`] computes dry-run execution waves.

pub mod plan;
pub mod report;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::model::ExecutorConfig;
use crate::declaration::{ProcessedDependency, TaskId};
use crate::engine::{Runtime, RuntimeEvent};
use crate::errors::Result;
use crate::exec::{ExecutorBackend, PoolExecutorBackend};
use crate::task::{Task, TaskFields};

pub use report::{Blocker, FailureCause, RunReport, TaskFailure, Transition, UnsatisfiedTask};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};

/// A built, validated schedule owning every task instance.
///
/// Running it consumes it; each instance runs at most once.
pub struct Schedule {
    pub(crate) order: Vec<TaskId>,
    pub(crate) instances: HashMap<TaskId, Box<dyn Task>>,
    pub(crate) dependencies: HashMap<TaskId, Vec<ProcessedDependency>>,
    pub(crate) fields: HashMap<TaskId, Arc<TaskFields>>,
}

impl Schedule {
    pub(crate) fn new(
        order: Vec<TaskId>,
        instances: HashMap<TaskId, Box<dyn Task>>,
        dependencies: HashMap<TaskId, Vec<ProcessedDependency>>,
        fields: HashMap<TaskId, Arc<TaskFields>>,
    ) -> Self {
        Self {
            order,
            instances,
            dependencies,
            fields,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.instances.contains_key(task)
    }

    /// Task ids in declaration order.
    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.order.iter()
    }

    pub fn dependencies_of(&self, task: &str) -> &[ProcessedDependency] {
        self.dependencies
            .get(task)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fields_of(&self, task: &str) -> Option<&TaskFields> {
        self.fields.get(task).map(Arc::as_ref)
    }

    pub fn instance(&self, task: &str) -> Option<&dyn Task> {
        self.instances.get(task).map(Box::as_ref)
    }

    /// Execution waves: every task appears one wave after the latest of its
    /// producers.
    pub fn plan(&self) -> Result<Vec<Vec<TaskId>>> {
        plan::execution_waves(&self.order, &self.dependencies)
    }

    /// Hand the schedule to a [`Scheduler`] to drive it by hand.
    pub fn into_scheduler(self) -> Scheduler {
        Scheduler::from_schedule(self)
    }

    /// Run every task on the default worker pool.
    pub async fn run(self) -> Result<RunReport> {
        self.run_with(&ExecutorConfig::default()).await
    }

    pub async fn run_with(self, config: &ExecutorConfig) -> Result<RunReport> {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(config.event_buffer.max(1));
        let executor = PoolExecutorBackend::new(tx, config.max_concurrency);
        self.run_on(executor, rx).await
    }

    /// Run on a caller-provided backend.
    ///
    /// The backend must report progress on the sending half of `events`.
    pub async fn run_on<E: ExecutorBackend>(
        self,
        executor: E,
        events: mpsc::Receiver<RuntimeEvent>,
    ) -> Result<RunReport> {
        info!(tasks = self.len(), "running schedule");
        let runtime = Runtime::new(self.into_scheduler(), events, executor);
        runtime.run().await
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("order", &self.order)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
