// src/errors.rs

//! Crate-wide error types.
//!
//! - [`BuildError`] covers everything that can go wrong while declaring and
//!   building a schedule. All variants are fatal to the build.
//! - [`ScheduleError`] is the top-level error used by the runtime, config
//!   loading and the binary.

use std::fmt;

use thiserror::Error;

use crate::declaration::{TaskId, TaskType};
use crate::schedule::report::{TaskFailure, UnsatisfiedTask};

/// Errors raised by [`ScheduleBuilder`](crate::dag::ScheduleBuilder).
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("task '{0}' is already added to the schedule")]
    DuplicateTaskId(TaskId),

    #[error("task '{producer}' does not exist in the schedule; task '{consumer}' can't depend on it")]
    UnknownProducer { consumer: TaskId, producer: TaskId },

    #[error("dependency of '{consumer}' on '{producer}' would create a cycle")]
    CycleDetected { consumer: TaskId, producer: TaskId },

    #[error("producer '{producer}' of task '{consumer}' not found in schedule builder")]
    ProducerNotFound { consumer: TaskId, producer: TaskId },

    #[error("dependencies of task '{task}' do not match its inputs: {}", join_problems(.problems))]
    DependencyMismatch {
        task: TaskId,
        problems: Vec<MismatchProblem>,
    },

    #[error("no usable constructor for task '{task}' of type '{task_type}'")]
    NoUsableConstructor {
        task: TaskId,
        task_type: TaskType,
        #[source]
        source: anyhow::Error,
    },
}

/// A single disagreement between a task's declared inputs and its
/// dependency descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchProblem {
    /// A declared input that no descriptor feeds.
    MissingInput { input: String },
    /// A declared input fed by more than one descriptor.
    DuplicateInput { input: String, count: usize },
    /// A descriptor targets an input the task type does not declare.
    UnknownInput { input: String, producer: TaskId },
    /// A descriptor names an output the producer type does not declare.
    UnknownOutput { producer: TaskId, output: String },
    TypeMismatch {
        input: String,
        expected: &'static str,
        producer: TaskId,
        output: String,
        found: &'static str,
    },
    /// The field inspector knows nothing about this task type.
    UnknownTaskType(TaskType),
}

impl fmt::Display for MismatchProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchProblem::MissingInput { input } => {
                write!(f, "input '{input}' is not fed by any dependency")
            }
            MismatchProblem::DuplicateInput { input, count } => {
                write!(f, "input '{input}' is fed by {count} dependencies")
            }
            MismatchProblem::UnknownInput { input, producer } => write!(
                f,
                "dependency on '{producer}' targets undeclared input '{input}'"
            ),
            MismatchProblem::UnknownOutput { producer, output } => {
                write!(f, "task '{producer}' does not declare output '{output}'")
            }
            MismatchProblem::TypeMismatch {
                input,
                expected,
                producer,
                output,
                found,
            } => write!(
                f,
                "input '{input}' expects {expected} but output '{output}' of '{producer}' is {found}"
            ),
            MismatchProblem::UnknownTaskType(task_type) => {
                write!(f, "task type '{task_type}' cannot be inspected")
            }
        }
    }
}

fn join_problems(problems: &[MismatchProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(
        "schedule run failed: {} failed task(s), {} unsatisfied task(s)",
        .failed.len(),
        .unsatisfied.len()
    )]
    Execution {
        failed: Vec<TaskFailure>,
        unsatisfied: Vec<UnsatisfiedTask>,
    },

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScheduleError>;
