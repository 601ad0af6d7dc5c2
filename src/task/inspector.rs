// src/task/inspector.rs

//! Field inspection: which inputs and outputs a task type declares.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::declaration::TaskType;

/// Runtime identity of a field's Rust type.
///
/// Equality is by [`TypeId`]; the name is only kept for diagnostics.
#[derive(Clone, Copy)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    ty: ValueType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn of<T: Any>(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::of::<T>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.ty
    }
}

/// Declared inputs and outputs of one task type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    inputs: Vec<FieldSpec>,
    outputs: Vec<FieldSpec>,
}

impl TaskFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(FieldSpec::of::<T>(name));
        self
    }

    pub fn with_output<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(FieldSpec::of::<T>(name));
        self
    }

    pub fn inputs(&self) -> &[FieldSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FieldSpec] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&FieldSpec> {
        self.inputs.iter().find(|f| f.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&FieldSpec> {
        self.outputs.iter().find(|f| f.name == name)
    }
}

/// Reports the declared fields of task types.
///
/// Results must be a pure function of the type. The core trusts the report;
/// it does not cross-check it against what the task actually accepts.
pub trait FieldInspector: Send + Sync {
    fn inspect(&self, task_type: &TaskType) -> Option<Arc<TaskFields>>;

    fn describe_inputs(&self, task_type: &TaskType) -> Option<Vec<FieldSpec>> {
        self.inspect(task_type).map(|f| f.inputs().to_vec())
    }

    fn describe_outputs(&self, task_type: &TaskType) -> Option<Vec<FieldSpec>> {
        self.inspect(task_type).map(|f| f.outputs().to_vec())
    }
}

type Describer = Arc<dyn Fn() -> TaskFields + Send + Sync>;

/// A [`FieldInspector`] backed by per-type describe functions, memoizing the
/// first result for each type.
///
/// Once a type has been described its entry is never rewritten, only read.
#[derive(Default)]
pub struct CachingInspector {
    describers: HashMap<TaskType, Describer>,
    cache: RwLock<HashMap<TaskType, Arc<TaskFields>>>,
}

impl CachingInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_describer<F>(mut self, task_type: impl Into<TaskType>, describe: F) -> Self
    where
        F: Fn() -> TaskFields + Send + Sync + 'static,
    {
        self.add_describer(task_type.into(), Arc::new(describe));
        self
    }

    /// Register (or replace) the describe function of a type. Replacing drops
    /// any cached result for it.
    pub(crate) fn add_describer(&mut self, task_type: TaskType, describe: Describer) {
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_type);
        self.describers.insert(task_type, describe);
    }

    pub fn knows(&self, task_type: &TaskType) -> bool {
        self.describers.contains_key(task_type)
    }

    /// Number of types described so far.
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl FieldInspector for CachingInspector {
    fn inspect(&self, task_type: &TaskType) -> Option<Arc<TaskFields>> {
        if let Some(fields) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_type)
        {
            return Some(Arc::clone(fields));
        }

        let describe = self.describers.get(task_type)?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have filled the entry between the two locks.
        let fields = cache
            .entry(task_type.clone())
            .or_insert_with(|| {
                debug!(task_type = %task_type, "describing task type fields");
                Arc::new(describe())
            })
            .clone();

        Some(fields)
    }
}

impl fmt::Debug for CachingInspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.describers.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("CachingInspector")
            .field("types", &types)
            .field("cached", &self.cached_len())
            .finish()
    }
}
