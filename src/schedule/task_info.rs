// src/schedule/task_info.rs

//! Per-task runtime state.

use std::fmt;
use std::sync::Arc;

use crate::declaration::{ProcessedDependency, TaskId};
use crate::task::{Outputs, Task, TaskFields, Value};

/// Lifecycle of a task within one run.
///
/// `Pending -> Ready -> Running -> Completed | Failed`. A task downstream of a
/// failure goes straight from `Pending` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRunState {
    /// Waiting on at least one dependency.
    Pending,
    /// Dependencies satisfied; handed to the executor but not started yet.
    Ready,
    Running,
    Completed,
    Failed,
}

impl TaskRunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskRunState::Completed | TaskRunState::Failed)
    }

    /// Dispatched but not yet finished.
    pub fn is_outstanding(self) -> bool {
        matches!(self, TaskRunState::Ready | TaskRunState::Running)
    }
}

/// Static task information from the schedule, plus per-run state.
pub(crate) struct TaskInfo {
    pub id: TaskId,
    pub dependencies: Vec<ProcessedDependency>,
    /// Distinct producers, in first-declared order.
    pub producers: Vec<TaskId>,
    /// Direct consumers.
    pub dependents: Vec<TaskId>,
    pub fields: Arc<TaskFields>,
    /// Taken when the task is dispatched.
    pub instance: Option<Box<dyn Task>>,
    pub run_state: TaskRunState,
    /// Recorded on completion, before any consumer is re-evaluated.
    pub outputs: Option<Outputs>,
}

impl fmt::Debug for TaskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInfo")
            .field("id", &self.id)
            .field("producers", &self.producers)
            .field("dependents", &self.dependents)
            .field("run_state", &self.run_state)
            .field("has_instance", &self.instance.is_some())
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// A task the scheduler wants the executor to run now, with its inputs
/// already gathered from the producers' recorded outputs.
pub struct ScheduledTask {
    pub id: TaskId,
    pub instance: Box<dyn Task>,
    /// `(input field, value)` pairs.
    pub inputs: Vec<(String, Value)>,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<_> = self.inputs.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("inputs", &inputs)
            .finish_non_exhaustive()
    }
}
