// src/task/mod.rs

//! The task contract.
//!
//! - [`Task`] is the object-safe trait the runtime drives: inputs are pushed
//!   in with [`Task::set_input`], then [`Task::run`] is called once, then the
//!   produced values are read back with [`Task::take_outputs`].
//! - [`TaskKind`] is the static side: a type name, a constructor taking a
//!   [`TaskId`], and the input/output fields the type declares.
//! - [`inspector`] reports declared fields per task type and caches them.
//! - [`registry`] maps task types to factories.

pub mod inspector;
pub mod registry;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::declaration::TaskId;

pub use inspector::{CachingInspector, FieldInspector, FieldSpec, TaskFields, ValueType};
pub use registry::{TaskFactory, TaskRegistry};

/// A type-erased, immutable value flowing from a producer output to a
/// consumer input.
///
/// Cloning shares the underlying value; nobody can mutate it once recorded,
/// so every consumer sees exactly what the producer emitted.
#[derive(Clone)]
pub struct Value {
    ty: ValueType,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            ty: ValueType::of::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clone the value out as a `T`, failing if it holds something else.
    pub fn get<T: Any + Clone>(&self) -> anyhow::Result<T> {
        self.downcast_ref::<T>().cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "value of type {} requested as {}",
                self.ty.name(),
                std::any::type_name::<T>()
            )
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.ty.name())
    }
}

/// Named values produced by one run of a task.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    values: BTreeMap<String, Value>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Value::new(value));
    }

    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Typed access to an output, `None` if absent or of another type.
    pub fn get_as<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A unit of work placed in a schedule.
///
/// Implementations own only their own state. The runtime moves each instance
/// onto a worker thread, so `run` may block.
pub trait Task: Send + 'static {
    fn id(&self) -> &TaskId;

    /// Receive the value for one declared input field.
    ///
    /// Called once per input before [`Task::run`].
    fn set_input(&mut self, field: &str, value: Value) -> anyhow::Result<()>;

    fn run(&mut self) -> anyhow::Result<()>;

    /// Hand over the outputs produced by the last successful run.
    ///
    /// Declared outputs may be omitted; consumers of an omitted output never
    /// become ready.
    fn take_outputs(&mut self) -> Outputs;
}

/// Static description of a task implementation, used for registration.
pub trait TaskKind: Task + Sized {
    const TYPE_NAME: &'static str;

    fn create(id: TaskId) -> anyhow::Result<Self>;

    fn fields() -> TaskFields;
}
