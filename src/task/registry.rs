// src/task/registry.rs

//! Task factories keyed by [`TaskType`].
//!
//! Every task type that appears in a declaration must be registered here
//! before the schedule is built. Registration also teaches the registry's
//! [`CachingInspector`] which fields the type declares.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, error};

use crate::declaration::{TaskId, TaskType};
use crate::errors::BuildError;
use crate::task::{CachingInspector, Task, TaskFields, TaskKind};

/// Constructor for one task type: takes the id, returns a fresh instance.
pub type TaskFactory = Arc<dyn Fn(TaskId) -> anyhow::Result<Box<dyn Task>> + Send + Sync>;

#[derive(Default)]
pub struct TaskRegistry {
    factories: HashMap<TaskType, TaskFactory>,
    inspector: CachingInspector,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`TaskKind`] under its `TYPE_NAME`.
    pub fn register<T: TaskKind>(&mut self) -> &mut Self {
        let factory: TaskFactory =
            Arc::new(|id| T::create(id).map(|task| Box::new(task) as Box<dyn Task>));
        self.insert(TaskType::of::<T>(), Arc::new(T::fields), factory);
        self
    }

    /// Register a task type from a closure and an explicit field list.
    pub fn register_factory<F>(
        &mut self,
        task_type: impl Into<TaskType>,
        fields: TaskFields,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(TaskId) -> anyhow::Result<Box<dyn Task>> + Send + Sync + 'static,
    {
        let fields = Arc::new(fields);
        self.insert(
            task_type.into(),
            Arc::new(move || TaskFields::clone(&fields)),
            Arc::new(factory),
        );
        self
    }

    fn insert(
        &mut self,
        task_type: TaskType,
        describe: Arc<dyn Fn() -> TaskFields + Send + Sync>,
        factory: TaskFactory,
    ) {
        debug!(task_type = %task_type, "registering task type");
        self.inspector.add_describer(task_type.clone(), describe);
        self.factories.insert(task_type, factory);
    }

    pub fn contains(&self, task_type: &TaskType) -> bool {
        self.factories.contains_key(task_type)
    }

    pub fn task_types(&self) -> impl Iterator<Item = &TaskType> {
        self.factories.keys()
    }

    /// The inspector used by [`ScheduleBuilder::build`](crate::dag::ScheduleBuilder::build).
    pub fn inspector(&self) -> &CachingInspector {
        &self.inspector
    }

    /// Fail with [`BuildError::NoUsableConstructor`] unless `task_type` has a
    /// factory.
    pub(crate) fn ensure_registered(
        &self,
        id: &TaskId,
        task_type: &TaskType,
    ) -> Result<(), BuildError> {
        if self.contains(task_type) {
            return Ok(());
        }
        Err(BuildError::NoUsableConstructor {
            task: id.clone(),
            task_type: task_type.clone(),
            source: anyhow!("no factory registered for '{task_type}'"),
        })
    }

    /// Create the instance for `id`.
    ///
    /// A missing factory, a factory error, a factory panic, or an instance
    /// reporting a different id all yield [`BuildError::NoUsableConstructor`].
    pub(crate) fn instantiate(
        &self,
        id: &TaskId,
        task_type: &TaskType,
    ) -> Result<Box<dyn Task>, BuildError> {
        let no_constructor = |source: anyhow::Error| {
            error!(task = %id, task_type = %task_type, error = %source, "cannot instantiate task");
            BuildError::NoUsableConstructor {
                task: id.clone(),
                task_type: task_type.clone(),
                source,
            }
        };

        let Some(factory) = self.factories.get(task_type) else {
            return Err(no_constructor(anyhow!("no factory registered for '{task_type}'")));
        };

        let instance = match panic::catch_unwind(AssertUnwindSafe(|| factory(id.clone()))) {
            Ok(Ok(instance)) => instance,
            Ok(Err(err)) => return Err(no_constructor(err.context("task factory failed"))),
            Err(_) => return Err(no_constructor(anyhow!("task factory panicked"))),
        };

        if instance.id() != id {
            return Err(no_constructor(anyhow!(
                "factory returned a task with id '{}'",
                instance.id()
            )));
        }

        Ok(instance)
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("inspector", &self.inspector)
            .finish_non_exhaustive()
    }
}
