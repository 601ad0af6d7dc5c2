// src/schedule/report.rs

//! Results of a schedule run.

use std::collections::HashMap;
use std::fmt;

use crate::declaration::TaskId;
use crate::errors::{Result, ScheduleError};
use crate::schedule::task_info::TaskRunState;
use crate::task::Outputs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// `set_input` or `run` returned an error, or an output had the wrong type.
    Execution(String),
    Panicked(String),
    /// Never ran because this upstream task failed.
    Upstream(TaskId),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Execution(msg) => write!(f, "{msg}"),
            FailureCause::Panicked(msg) => write!(f, "panicked: {msg}"),
            FailureCause::Upstream(task) => write!(f, "upstream failure of '{task}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskId,
    pub cause: FailureCause,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed: {}", self.task, self.cause)
    }
}

/// Why a task never became ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    /// The producer completed without emitting this output.
    MissingOutput { producer: TaskId, output: String },
    /// The producer itself never completed.
    ProducerPending(TaskId),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::MissingOutput { producer, output } => {
                write!(f, "'{producer}' completed without output '{output}'")
            }
            Blocker::ProducerPending(producer) => write!(f, "'{producer}' never completed"),
        }
    }
}

/// A task still `Pending` after the run quiesced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedTask {
    pub task: TaskId,
    pub blocked_on: Vec<Blocker>,
}

impl fmt::Display for UnsatisfiedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<String> = self.blocked_on.iter().map(|b| b.to_string()).collect();
        write!(f, "task '{}' never became ready: {}", self.task, reasons.join(", "))
    }
}

/// One state change, in the order the scheduler applied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub task: TaskId,
    pub state: TaskRunState,
}

/// Aggregate outcome of [`Schedule::run`](crate::schedule::Schedule::run).
#[derive(Debug)]
pub struct RunReport {
    order: Vec<TaskId>,
    states: HashMap<TaskId, TaskRunState>,
    outputs: HashMap<TaskId, Outputs>,
    failures: Vec<TaskFailure>,
    unsatisfied: Vec<UnsatisfiedTask>,
    transitions: Vec<Transition>,
}

impl RunReport {
    pub(crate) fn new(
        order: Vec<TaskId>,
        states: HashMap<TaskId, TaskRunState>,
        outputs: HashMap<TaskId, Outputs>,
        failures: Vec<TaskFailure>,
        unsatisfied: Vec<UnsatisfiedTask>,
        transitions: Vec<Transition>,
    ) -> Self {
        Self {
            order,
            states,
            outputs,
            failures,
            unsatisfied,
            transitions,
        }
    }

    /// Task ids in declaration order.
    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.order.iter()
    }

    pub fn state_of(&self, task: &str) -> Option<TaskRunState> {
        self.states.get(task).copied()
    }

    pub fn outputs_of(&self, task: &str) -> Option<&Outputs> {
        self.outputs.get(task)
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn failure_of(&self, task: &str) -> Option<&FailureCause> {
        self.failures
            .iter()
            .find(|f| f.task.as_str() == task)
            .map(|f| &f.cause)
    }

    pub fn unsatisfied(&self) -> &[UnsatisfiedTask] {
        &self.unsatisfied
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Position of the first transition of `task` into `state`.
    pub fn transition_index(&self, task: &str, state: TaskRunState) -> Option<usize> {
        self.transitions
            .iter()
            .position(|t| t.task.as_str() == task && t.state == state)
    }

    pub fn completed(&self) -> impl Iterator<Item = &TaskId> {
        self.order
            .iter()
            .filter(|id| self.states.get(*id) == Some(&TaskRunState::Completed))
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.unsatisfied.is_empty()
    }

    /// `Ok(self)` if every task completed, otherwise
    /// [`ScheduleError::Execution`] listing every failed and unsatisfied task.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScheduleError::Execution {
                failed: self.failures,
                unsatisfied: self.unsatisfied,
            })
        }
    }
}
