// src/declaration.rs

//! Task declarations and the dependency descriptors that connect them.
//!
//! Everything in here is immutable data. Descriptors are not checked when
//! they are created; the [`ScheduleBuilder`](crate::dag::ScheduleBuilder)
//! validates them when the declaration is added and again at build time.

use std::borrow::Borrow;
use std::fmt;

use crate::task::TaskKind;

/// Identifier of a task, unique within one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&TaskId> for TaskId {
    fn from(value: &TaskId) -> Self {
        value.clone()
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Name under which a task implementation is registered in a
/// [`TaskRegistry`](crate::task::TaskRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskType(String);

impl TaskType {
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The type name a [`TaskKind`] registers itself under.
    pub fn of<T: TaskKind>() -> Self {
        Self(T::TYPE_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for TaskType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// A named output of the producer feeds a named input of the consumer.
    OutputToInput,
    /// The consumer only waits for the producer to complete.
    CompletionOnly,
}

/// One edge of the dependency graph, as declared by the consumer.
///
/// `output_name` and `input_name` are present iff the kind is
/// [`DependencyKind::OutputToInput`]; the two constructors are the only way
/// to create a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    kind: DependencyKind,
    producer: TaskId,
    output: Option<String>,
    input: Option<String>,
}

impl DependencyDescriptor {
    /// Output `output` of task `producer` feeds input field `input`.
    pub fn output(
        output: impl Into<String>,
        producer: impl Into<TaskId>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            kind: DependencyKind::OutputToInput,
            producer: producer.into(),
            output: Some(output.into()),
            input: Some(input.into()),
        }
    }

    /// Run after `producer` completes; no data is transferred.
    pub fn completion_of(producer: impl Into<TaskId>) -> Self {
        Self {
            kind: DependencyKind::CompletionOnly,
            producer: producer.into(),
            output: None,
            input: None,
        }
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn producer(&self) -> &TaskId {
        &self.producer
    }

    pub fn output_name(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn input_name(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// `(output, input)` for data dependencies, `None` for completion-only ones.
    pub fn data_binding(&self) -> Option<(&str, &str)> {
        match (self.output.as_deref(), self.input.as_deref()) {
            (Some(output), Some(input)) => Some((output, input)),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_binding() {
            Some((output, input)) => write!(
                f,
                "output '{output}' of '{}' as input '{input}'",
                self.producer
            ),
            None => write!(f, "completion of '{}'", self.producer),
        }
    }
}

/// A task to be placed in a schedule: its id, its implementation type and
/// what it waits for.
///
/// A declaration with no dependencies is a root task.
#[derive(Debug, Clone)]
pub struct TaskDeclaration {
    id: TaskId,
    task_type: TaskType,
    dependencies: Vec<DependencyDescriptor>,
}

impl TaskDeclaration {
    pub fn new(id: impl Into<TaskId>, task_type: impl Into<TaskType>) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.into(),
            dependencies: Vec::new(),
        }
    }

    /// Declare a task implemented by the [`TaskKind`] `T`.
    pub fn of<T: TaskKind>(id: impl Into<TaskId>) -> Self {
        Self::new(id, TaskType::of::<T>())
    }

    pub fn wait_for(mut self, dependency: DependencyDescriptor) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn wait_for_all(
        mut self,
        dependencies: impl IntoIterator<Item = DependencyDescriptor>,
    ) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.dependencies
    }
}

/// A descriptor paired with the declared type of its producer.
///
/// Producers may be declared after the descriptor is written, so this is only
/// computed once the whole declaration set is known, at build time.
#[derive(Debug, Clone)]
pub struct ProcessedDependency {
    producer_type: TaskType,
    descriptor: DependencyDescriptor,
}

impl ProcessedDependency {
    pub(crate) fn new(producer_type: TaskType, descriptor: DependencyDescriptor) -> Self {
        Self {
            producer_type,
            descriptor,
        }
    }

    pub fn producer_type(&self) -> &TaskType {
        &self.producer_type
    }

    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.descriptor
    }

    pub fn producer(&self) -> &TaskId {
        self.descriptor.producer()
    }
}
