// src/dag/builder.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::dag::graph::DependencyGraph;
use crate::dag::index::DependencyIndex;
use crate::dag::validate::DependencyValidator;
use crate::declaration::{DependencyDescriptor, ProcessedDependency, TaskDeclaration, TaskId, TaskType};
use crate::errors::BuildError;
use crate::schedule::Schedule;
use crate::task::{FieldInspector, TaskRegistry};

/// Accumulates task declarations and turns them into a [`Schedule`].
///
/// Declarations are checked eagerly as they are added: ids must be unique,
/// producers must already be present, and no edge may close a cycle. Type
/// checking and instantiation happen in [`ScheduleBuilder::build`].
///
/// Every method takes the builder by value. A failed call drops it, and
/// `build` consumes it, so a builder is never reused after an error or after
/// building.
///
/// ```ignore
/// let schedule = ScheduleBuilder::start_with([TaskDeclaration::new("Start", "start")])?
///     .add(
///         TaskDeclaration::new("A", "double")
///             .wait_for(DependencyDescriptor::output("start_out", "Start", "a_int")),
///     )?
///     .build(&registry)?;
/// ```
#[derive(Debug, Default)]
pub struct ScheduleBuilder {
    graph: DependencyGraph,
    index: DependencyIndex,
    /// Declarations in insertion order.
    declarations: Vec<TaskDeclaration>,
    /// Position of each task in `declarations`.
    positions: HashMap<TaskId, usize>,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded with the given declarations.
    ///
    /// Fails with [`BuildError::DuplicateTaskId`] if two of them share an id.
    /// The seeds are then added in order with the same checks as
    /// [`ScheduleBuilder::add`].
    pub fn start_with(
        declarations: impl IntoIterator<Item = TaskDeclaration>,
    ) -> Result<Self, BuildError> {
        let declarations: Vec<TaskDeclaration> = declarations.into_iter().collect();

        let mut seen: HashSet<&TaskId> = HashSet::new();
        for declaration in &declarations {
            if !seen.insert(declaration.id()) {
                return Err(BuildError::DuplicateTaskId(declaration.id().clone()));
            }
        }

        declarations
            .into_iter()
            .try_fold(Self::new(), |builder, declaration| builder.add(declaration))
    }

    /// Add one more task declaration.
    pub fn add(mut self, declaration: TaskDeclaration) -> Result<Self, BuildError> {
        let id = declaration.id().clone();

        if !self.graph.add_vertex(id.clone()) {
            return Err(BuildError::DuplicateTaskId(id));
        }

        for dependency in declaration.dependencies() {
            let producer = dependency.producer();
            if !self.positions.contains_key(producer) && producer != &id {
                return Err(BuildError::UnknownProducer {
                    consumer: id,
                    producer: producer.clone(),
                });
            }

            self.graph.add_edge(&id, producer)?;
            self.index.append(&id, dependency.clone());
        }

        debug!(
            task = %id,
            task_type = %declaration.task_type(),
            dependencies = declaration.dependencies().len(),
            "task added to schedule"
        );

        self.positions.insert(id, self.declarations.len());
        self.declarations.push(declaration);
        Ok(self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// All descriptors from `consumer` to `producer`, in insertion order.
    pub fn dependencies_between(&self, consumer: &str, producer: &str) -> &[DependencyDescriptor] {
        self.index.between(consumer, producer)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Build the schedule, inspecting fields through the registry's own
    /// caching inspector.
    pub fn build(self, registry: &TaskRegistry) -> Result<Schedule, BuildError> {
        self.build_with(registry, registry.inspector())
    }

    /// Build the schedule with an explicitly supplied field inspector.
    ///
    /// For every task: resolve producer types, validate inputs against the
    /// dependencies, instantiate through the registry. The first error
    /// aborts the whole build.
    pub fn build_with(
        self,
        registry: &TaskRegistry,
        inspector: &dyn FieldInspector,
    ) -> Result<Schedule, BuildError> {
        let validator = DependencyValidator::new(inspector);

        let mut order = Vec::with_capacity(self.declarations.len());
        let mut instances = HashMap::with_capacity(self.declarations.len());
        let mut dependencies = HashMap::with_capacity(self.declarations.len());
        let mut fields = HashMap::with_capacity(self.declarations.len());

        for declaration in &self.declarations {
            let id = declaration.id();
            let processed = self.process_dependencies(declaration)?;

            registry.ensure_registered(id, declaration.task_type())?;
            let task_fields = validator.validate(id, declaration.task_type(), &processed)?;
            let instance = registry.instantiate(id, declaration.task_type())?;

            order.push(id.clone());
            instances.insert(id.clone(), instance);
            dependencies.insert(id.clone(), processed);
            fields.insert(id.clone(), task_fields);
        }

        info!(tasks = order.len(), "schedule built");

        Ok(Schedule::new(order, instances, dependencies, fields))
    }

    fn process_dependencies(
        &self,
        declaration: &TaskDeclaration,
    ) -> Result<Vec<ProcessedDependency>, BuildError> {
        declaration
            .dependencies()
            .iter()
            .map(|descriptor| {
                let producer_type = self.type_of(descriptor.producer()).ok_or_else(|| {
                    BuildError::ProducerNotFound {
                        consumer: declaration.id().clone(),
                        producer: descriptor.producer().clone(),
                    }
                })?;
                Ok(ProcessedDependency::new(producer_type.clone(), descriptor.clone()))
            })
            .collect()
    }

    fn type_of(&self, id: &TaskId) -> Option<&TaskType> {
        self.positions
            .get(id)
            .map(|&pos| self.declarations[pos].task_type())
    }
}
