#![allow(dead_code)]

use std::sync::Arc;

use dagschedule::task::{Outputs, TaskFields, TaskRegistry};
use dagschedule::{DependencyDescriptor, TaskDeclaration, TaskId};

use crate::tasks::{ConcurrencyProbe, ExecutionLog, Inputs, register_scripted, standard_kinds};

/// Builder for a `TaskRegistry` preloaded with the standard test kinds.
pub struct RegistryBuilder {
    registry: TaskRegistry,
    log: ExecutionLog,
    probe: Arc<ConcurrencyProbe>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        let log = ExecutionLog::new();
        let probe = ConcurrencyProbe::new();
        let mut registry = TaskRegistry::new();
        standard_kinds(&mut registry, &log, &probe);
        Self {
            registry,
            log,
            probe,
        }
    }

    /// Add a custom scripted kind that records into the shared log.
    pub fn with_kind<F>(mut self, type_name: &str, fields: TaskFields, script: F) -> Self
    where
        F: Fn(&TaskId, &Inputs) -> anyhow::Result<Outputs> + Send + Sync + 'static,
    {
        register_scripted(
            &mut self.registry,
            type_name,
            fields,
            Some(self.log.clone()),
            script,
        );
        self
    }

    pub fn log(&self) -> ExecutionLog {
        self.log.clone()
    }

    pub fn probe(&self) -> Arc<ConcurrencyProbe> {
        Arc::clone(&self.probe)
    }

    pub fn build(self) -> TaskRegistry {
        self.registry
    }

    /// Registry plus handles to its log and probe.
    pub fn build_with_handles(self) -> (TaskRegistry, ExecutionLog, Arc<ConcurrencyProbe>) {
        (self.registry, self.log, self.probe)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `Emit` root task.
pub fn emit(id: &str) -> TaskDeclaration {
    TaskDeclaration::new(id, "Emit")
}

/// Task of `kind` reading `out` of `producer` into its `in`.
pub fn fed_by(id: &str, kind: &str, producer: &str) -> TaskDeclaration {
    TaskDeclaration::new(id, kind).wait_for(DependencyDescriptor::output("out", producer, "in"))
}

/// `AddOne` task fed by `producer`.
pub fn add_one(id: &str, producer: &str) -> TaskDeclaration {
    fed_by(id, "AddOne", producer)
}

/// `Sink` task fed by `producer`.
pub fn sink(id: &str, producer: &str) -> TaskDeclaration {
    fed_by(id, "Sink", producer)
}

/// `Join` task summing `left` and `right`.
pub fn join(id: &str, left: &str, right: &str) -> TaskDeclaration {
    TaskDeclaration::new(id, "Join")
        .wait_for(DependencyDescriptor::output("out", left, "left"))
        .wait_for(DependencyDescriptor::output("out", right, "right"))
}

/// Task of `kind` that only waits for `producers` to complete.
pub fn after(id: &str, kind: &str, producers: &[&str]) -> TaskDeclaration {
    TaskDeclaration::new(id, kind).wait_for_all(
        producers
            .iter()
            .map(|p| DependencyDescriptor::completion_of(*p)),
    )
}
