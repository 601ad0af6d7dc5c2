// src/dag/index.rs

use std::collections::HashMap;

use crate::declaration::{DependencyDescriptor, TaskId};

/// Descriptors grouped by `(consumer, producer)` pair.
///
/// A pair can carry several descriptors (say a completion dependency plus an
/// output dependency on the same producer); they are kept in insertion order
/// and never overwritten.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    by_consumer: HashMap<TaskId, HashMap<TaskId, Vec<DependencyDescriptor>>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, consumer: &TaskId, descriptor: DependencyDescriptor) {
        self.by_consumer
            .entry(consumer.clone())
            .or_default()
            .entry(descriptor.producer().clone())
            .or_default()
            .push(descriptor);
    }

    pub fn between(&self, consumer: &str, producer: &str) -> &[DependencyDescriptor] {
        self.by_consumer
            .get(consumer)
            .and_then(|producers| producers.get(producer))
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }

    /// Number of distinct `(consumer, producer)` pairs.
    pub fn pair_count(&self) -> usize {
        self.by_consumer.values().map(|p| p.len()).sum()
    }
}
