// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::declaration::TaskId;
use crate::errors::BuildError;

/// Internal node structure: stores immediate producers and consumers.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Tasks this one waits for (edge targets).
    deps: Vec<TaskId>,
    /// Tasks waiting for this one.
    dependents: Vec<TaskId>,
}

/// Build-time dependency graph keyed by task id.
///
/// Edges point from consumer to producer. The graph is acyclic at all times:
/// [`DependencyGraph::add_edge`] checks reachability before committing, so a
/// cycle is rejected at insertion and never rolled back.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<TaskId, DagNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. Returns `false` if it was already present.
    pub fn add_vertex(&mut self, id: TaskId) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, DagNode::default());
        true
    }

    /// Add the edge `consumer -> producer`.
    ///
    /// Returns `Ok(false)` if the edge already existed (several descriptors
    /// may connect the same pair). The consumer vertex is created on demand;
    /// the producer must already be present.
    pub fn add_edge(&mut self, consumer: &TaskId, producer: &TaskId) -> Result<bool, BuildError> {
        if !self.nodes.contains_key(producer) {
            return Err(BuildError::UnknownProducer {
                consumer: consumer.clone(),
                producer: producer.clone(),
            });
        }

        if consumer == producer || self.reaches(producer, consumer) {
            return Err(BuildError::CycleDetected {
                consumer: consumer.clone(),
                producer: producer.clone(),
            });
        }

        let node = self.nodes.entry(consumer.clone()).or_default();
        if node.deps.contains(producer) {
            return Ok(false);
        }
        node.deps.push(producer.clone());

        if let Some(producer_node) = self.nodes.get_mut(producer) {
            producer_node.dependents.push(consumer.clone());
        }

        debug!(consumer = %consumer, producer = %producer, "added dependency edge");
        Ok(true)
    }

    /// Whether `to` can be reached from `from` by following producer edges.
    pub fn reaches(&self, from: &TaskId, to: &TaskId) -> bool {
        let mut stack: Vec<&TaskId> = vec![from];
        let mut visited: HashSet<&TaskId> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.deps.iter());
            }
        }

        false
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return all task ids.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.nodes.keys()
    }

    /// Immediate producers of a task.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate consumers of a task.
    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
