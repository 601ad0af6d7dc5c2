// src/schedule/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::declaration::TaskId;
use crate::schedule::report::{Blocker, Transition};
use crate::schedule::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::task::Value;

/// Manages per-run state transitions for tasks.
///
/// Every state change goes through [`StateManager::set_state`] so the
/// transition log stays complete.
pub struct StateManager<'a> {
    tasks: &'a mut HashMap<TaskId, TaskInfo>,
    transitions: &'a mut Vec<Transition>,
}

impl<'a> StateManager<'a> {
    pub(crate) fn new(
        tasks: &'a mut HashMap<TaskId, TaskInfo>,
        transitions: &'a mut Vec<Transition>,
    ) -> Self {
        Self { tasks, transitions }
    }

    pub fn set_state(&mut self, task: &TaskId, state: TaskRunState) {
        if let Some(info) = self.tasks.get_mut(task) {
            info.run_state = state;
            self.transitions.push(Transition {
                task: task.clone(),
                state,
            });
        }
    }

    /// Among `candidates`, find `Pending` tasks whose dependencies are all
    /// satisfied, mark them `Ready`, and hand them out with their inputs.
    pub fn collect_new_ready_tasks(&mut self, candidates: &[TaskId]) -> Vec<ScheduledTask> {
        // Decide first, then mutate to avoid borrowing issues.
        let tasks: &HashMap<TaskId, TaskInfo> = self.tasks;
        let ready: Vec<TaskId> = candidates
            .iter()
            .filter(|id| {
                tasks.get(*id).is_some_and(|info| {
                    info.run_state == TaskRunState::Pending && deps_satisfied(tasks, info)
                })
            })
            .cloned()
            .collect();

        let mut scheduled = Vec::with_capacity(ready.len());

        for id in ready {
            let inputs = gather_inputs(&*self.tasks, &id);
            let Some(instance) = self.tasks.get_mut(&id).and_then(|info| info.instance.take())
            else {
                warn!(task = %id, "ready task has no instance left; skipping dispatch");
                continue;
            };

            info!(task = %id, inputs = inputs.len(), "dependencies satisfied; task ready");
            self.set_state(&id, TaskRunState::Ready);
            scheduled.push(ScheduledTask {
                id,
                instance,
                inputs,
            });
        }

        scheduled
    }

    /// Mark every not-yet-run task downstream of `failed` as `Failed`.
    ///
    /// Returns the newly failed tasks, excluding `failed` itself.
    pub fn mark_dependents_failed(&mut self, failed: &TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self
            .tasks
            .get(failed)
            .map(|info| info.dependents.clone())
            .unwrap_or_default();

        let mut newly_failed = Vec::new();

        while let Some(id) = stack.pop() {
            let Some(info) = self.tasks.get(&id) else {
                continue;
            };

            match info.run_state {
                TaskRunState::Pending => {
                    let dependents = info.dependents.clone();
                    debug!(
                        task = %id,
                        upstream = %failed,
                        "marking dependent as Failed due to upstream failure"
                    );
                    self.set_state(&id, TaskRunState::Failed);
                    stack.extend(dependents);
                    newly_failed.push(id);
                }
                TaskRunState::Ready
                | TaskRunState::Running
                | TaskRunState::Completed
                | TaskRunState::Failed => {
                    // Already dispatched or terminal; dispatched work finishes
                    // on its own.
                }
            }
        }

        newly_failed
    }

    /// Number of tasks handed to the executor but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state.is_outstanding())
            .count()
    }
}

/// Whether every dependency of `info` is satisfied: each producer is
/// `Completed` and, for data dependencies, actually recorded the output.
pub(crate) fn deps_satisfied(tasks: &HashMap<TaskId, TaskInfo>, info: &TaskInfo) -> bool {
    info.dependencies.iter().all(|dep| {
        let Some(producer) = tasks.get(dep.producer()) else {
            warn!(task = %info.id, producer = %dep.producer(), "producer missing from tasks map");
            return false;
        };
        if producer.run_state != TaskRunState::Completed {
            return false;
        }
        match dep.descriptor().data_binding() {
            Some((output, _)) => producer
                .outputs
                .as_ref()
                .is_some_and(|outputs| outputs.contains(output)),
            None => true,
        }
    })
}

/// Everything keeping a `Pending` task from becoming ready.
pub(crate) fn blockers_of(tasks: &HashMap<TaskId, TaskInfo>, info: &TaskInfo) -> Vec<Blocker> {
    let mut blockers = Vec::new();

    for dep in &info.dependencies {
        let producer = dep.producer();
        let completed = tasks
            .get(producer)
            .filter(|p| p.run_state == TaskRunState::Completed);

        let blocker = match (completed, dep.descriptor().data_binding()) {
            (None, _) => Blocker::ProducerPending(producer.clone()),
            (Some(p), Some((output, _))) => {
                if p.outputs.as_ref().is_some_and(|o| o.contains(output)) {
                    continue;
                }
                Blocker::MissingOutput {
                    producer: producer.clone(),
                    output: output.to_string(),
                }
            }
            (Some(_), None) => continue,
        };

        if !blockers.contains(&blocker) {
            blockers.push(blocker);
        }
    }

    blockers
}

/// Collect `(input, value)` pairs for `task` from its producers' outputs.
fn gather_inputs(tasks: &HashMap<TaskId, TaskInfo>, task: &TaskId) -> Vec<(String, Value)> {
    let Some(info) = tasks.get(task) else {
        return Vec::new();
    };

    info.dependencies
        .iter()
        .filter_map(|dep| {
            let (output, input) = dep.descriptor().data_binding()?;
            let value = tasks
                .get(dep.producer())?
                .outputs
                .as_ref()?
                .get(output)?
                .clone();
            Some((input.to_string(), value))
        })
        .collect()
}
