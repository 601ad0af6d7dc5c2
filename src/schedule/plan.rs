// src/schedule/plan.rs

//! Dry-run execution plan.
//!
//! Groups tasks into waves: every task sits one wave after the latest of its
//! producers, so a wave only depends on earlier waves. Within a wave, tasks
//! keep declaration order.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::declaration::{ProcessedDependency, TaskId};
use crate::errors::{Result, ScheduleError};

pub(crate) fn execution_waves(
    order: &[TaskId],
    dependencies: &HashMap<TaskId, Vec<ProcessedDependency>>,
) -> Result<Vec<Vec<TaskId>>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in order {
        graph.add_node(id.as_str());
    }

    // Edges point producer -> consumer so a topological order runs
    // producers first.
    for id in order {
        for dep in dependencies.get(id).map(Vec::as_slice).unwrap_or_default() {
            graph.add_edge(dep.producer().as_str(), id.as_str(), ());
        }
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        ScheduleError::DagCycle(format!("cycle through task '{}'", cycle.node_id()))
    })?;

    let mut level: HashMap<&str, usize> = HashMap::with_capacity(sorted.len());
    for &node in &sorted {
        let depth = graph
            .neighbors_directed(node, Direction::Incoming)
            .filter_map(|producer| level.get(producer))
            .map(|l| l + 1)
            .max()
            .unwrap_or(0);
        level.insert(node, depth);
    }

    let wave_count = level.values().copied().max().map_or(0, |max| max + 1);
    let mut waves: Vec<Vec<TaskId>> = vec![Vec::new(); wave_count];

    for id in order {
        if let Some(&depth) = level.get(id.as_str()) {
            waves[depth].push(id.clone());
        }
    }

    debug!(tasks = order.len(), waves = waves.len(), "computed execution plan");
    Ok(waves)
}
