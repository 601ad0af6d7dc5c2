// src/engine/mod.rs

//! Orchestration engine for a schedule run.
//!
//! The pure core state machine lives in [`core`]; the async/IO shell that
//! reads executor events and dispatches work is implemented in [`runtime`].

use crate::declaration::TaskId;
use crate::schedule::report::FailureCause;
use crate::task::Outputs;

/// How a single task execution ended.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Success(Outputs),
    Failed(FailureCause),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }
}

/// Events flowing from the executor into the runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker picked the task up and is about to run it.
    TaskStarted { task: TaskId },
    /// The task finished; always sent after its `TaskStarted`.
    TaskCompleted { task: TaskId, outcome: TaskOutcome },
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreRuntime, CoreStep};
pub use runtime::Runtime;
