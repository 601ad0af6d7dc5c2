// src/schedule/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::declaration::TaskId;
use crate::engine::TaskOutcome;
use crate::schedule::Schedule;
use crate::schedule::report::{FailureCause, RunReport, TaskFailure, Transition, UnsatisfiedTask};
use crate::schedule::scheduler_step::SchedulerStep;
use crate::schedule::state_manager::{StateManager, blockers_of, deps_satisfied};
use crate::schedule::task_info::{TaskInfo, TaskRunState};
use crate::task::{Outputs, TaskFields};

/// Pure, synchronous core of a schedule run.
///
/// It owns the task instances and per-task state and decides:
/// - which tasks are ready (all producers completed, all consumed outputs
///   recorded)
/// - what inputs each ready task receives
/// - which tasks fail along with a failed producer
/// - when the run has quiesced
///
/// It performs no IO and knows nothing about threads; the async
/// [`Runtime`](crate::engine::Runtime) feeds it events one at a time, which
/// is what makes a producer's outputs visible before any consumer's
/// readiness check.
#[derive(Debug)]
pub struct Scheduler {
    /// Declaration order, for deterministic iteration.
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, TaskInfo>,
    transitions: Vec<Transition>,
    failures: Vec<TaskFailure>,
    started: bool,
}

impl Scheduler {
    /// Take ownership of a built schedule's instances and dependencies.
    pub fn from_schedule(schedule: Schedule) -> Self {
        let Schedule {
            order,
            mut instances,
            mut dependencies,
            mut fields,
        } = schedule;

        let mut tasks: HashMap<TaskId, TaskInfo> = HashMap::with_capacity(order.len());

        for id in &order {
            let deps = dependencies.remove(id).unwrap_or_default();
            let mut producers: Vec<TaskId> = Vec::new();
            for dep in &deps {
                if !producers.contains(dep.producer()) {
                    producers.push(dep.producer().clone());
                }
            }

            tasks.insert(
                id.clone(),
                TaskInfo {
                    id: id.clone(),
                    dependencies: deps,
                    producers,
                    dependents: Vec::new(),
                    fields: fields.remove(id).unwrap_or_default(),
                    instance: instances.remove(id),
                    run_state: TaskRunState::Pending,
                    outputs: None,
                },
            );
        }

        // Second pass: populate dependents from producers.
        for id in &order {
            let producers = tasks
                .get(id)
                .map(|info| info.producers.clone())
                .unwrap_or_default();

            for producer in producers {
                if let Some(node) = tasks.get_mut(&producer) {
                    node.dependents.push(id.clone());
                }
            }
        }

        Self {
            order,
            tasks,
            transitions: Vec::new(),
            failures: Vec::new(),
            started: false,
        }
    }

    /// Begin the run: every task without unresolved dependencies becomes
    /// ready.
    pub fn start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;

        debug!(tasks = self.order.len(), "scheduler: starting run");

        let mut manager = StateManager::new(&mut self.tasks, &mut self.transitions);
        let newly_scheduled = manager.collect_new_ready_tasks(&self.order);

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            quiescent: self.is_quiescent(),
        }
    }

    /// The executor began running `task`.
    pub fn handle_started(&mut self, task: &str) {
        let Some(id) = self.known_id(task) else {
            warn!(task = %task, "start reported for unknown task; ignoring");
            return;
        };

        match self.tasks.get(&id).map(|info| info.run_state) {
            Some(TaskRunState::Ready) => {
                debug!(task = %id, "task running");
                let mut manager = StateManager::new(&mut self.tasks, &mut self.transitions);
                manager.set_state(&id, TaskRunState::Running);
            }
            state => {
                warn!(task = %id, ?state, "start reported for task that is not ready; ignoring");
            }
        }
    }

    /// The executor finished `task` with the given outcome.
    ///
    /// On success the outputs are recorded first, then the task's direct
    /// consumers are re-evaluated. On failure every pending task downstream
    /// is failed without running.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(id) = self.known_id(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return self.idle_step();
        };

        match self.tasks.get(&id).map(|info| info.run_state) {
            Some(TaskRunState::Running) => {}
            Some(TaskRunState::Ready) => {
                debug!(task = %id, "completion without start report; treating as started");
                let mut manager = StateManager::new(&mut self.tasks, &mut self.transitions);
                manager.set_state(&id, TaskRunState::Running);
            }
            state => {
                warn!(task = %id, ?state, "completion for task that is not running; ignoring");
                return self.idle_step();
            }
        }

        let outcome = match outcome {
            TaskOutcome::Success(outputs) => {
                let fields = self.tasks.get(&id).map(|info| info.fields.clone()).unwrap_or_default();
                match check_outputs(&id, &fields, outputs) {
                    Ok(outputs) => TaskOutcome::Success(outputs),
                    Err(cause) => TaskOutcome::Failed(cause),
                }
            }
            failed => failed,
        };

        let mut step = SchedulerStep::default();

        match outcome {
            TaskOutcome::Success(outputs) => {
                let dependents = match self.tasks.get_mut(&id) {
                    Some(info) => {
                        info.outputs = Some(outputs);
                        info.dependents.clone()
                    }
                    None => Vec::new(),
                };
                info!(task = %id, "task completed");

                let mut manager = StateManager::new(&mut self.tasks, &mut self.transitions);
                manager.set_state(&id, TaskRunState::Completed);
                step.newly_scheduled = manager.collect_new_ready_tasks(&dependents);
            }
            TaskOutcome::Failed(cause) => {
                error!(task = %id, cause = %cause, "task failed; failing dependents");

                let mut manager = StateManager::new(&mut self.tasks, &mut self.transitions);
                manager.set_state(&id, TaskRunState::Failed);
                let cascaded = manager.mark_dependents_failed(&id);

                self.failures.push(TaskFailure {
                    task: id.clone(),
                    cause,
                });
                for downstream in &cascaded {
                    self.failures.push(TaskFailure {
                        task: downstream.clone(),
                        cause: FailureCause::Upstream(id.clone()),
                    });
                }

                step.newly_failed.push(id);
                step.newly_failed.extend(cascaded);
            }
        }

        step.quiescent = self.is_quiescent();
        if step.quiescent {
            info!("scheduler: nothing ready or running; run quiesced");
        }
        step
    }

    /// Started, and nothing is ready or running.
    pub fn is_quiescent(&self) -> bool {
        self.started && self.outstanding() == 0
    }

    /// Number of tasks dispatched but not finished.
    pub fn outstanding(&self) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state.is_outstanding())
            .count()
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.run_state)
    }

    /// Whether the dependencies of `task` are satisfied right now.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(deps_satisfied(&self.tasks, info))
    }

    /// Task ids in declaration order.
    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.order.iter()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Freeze the current state into a report. Tasks still `Pending` are
    /// reported as unsatisfied along with what blocks them.
    pub fn into_report(self) -> RunReport {
        let unsatisfied: Vec<UnsatisfiedTask> = self
            .order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|info| info.run_state == TaskRunState::Pending)
            .map(|info| UnsatisfiedTask {
                task: info.id.clone(),
                blocked_on: blockers_of(&self.tasks, info),
            })
            .collect();

        for task in &unsatisfied {
            warn!(task = %task.task, blockers = task.blocked_on.len(), "task never became ready");
        }

        let states = self
            .tasks
            .iter()
            .map(|(id, info)| (id.clone(), info.run_state))
            .collect();

        let outputs = self
            .tasks
            .into_iter()
            .filter_map(|(id, info)| info.outputs.map(|o| (id, o)))
            .collect();

        RunReport::new(
            self.order,
            states,
            outputs,
            self.failures,
            unsatisfied,
            self.transitions,
        )
    }

    fn known_id(&self, task: &str) -> Option<TaskId> {
        self.tasks.get(task).map(|info| info.id.clone())
    }

    fn idle_step(&self) -> SchedulerStep {
        SchedulerStep {
            quiescent: self.is_quiescent(),
            ..SchedulerStep::default()
        }
    }
}

/// Keep declared outputs, drop undeclared ones, reject wrongly typed ones.
fn check_outputs(
    task: &TaskId,
    fields: &TaskFields,
    mut outputs: Outputs,
) -> Result<Outputs, FailureCause> {
    let names: Vec<String> = outputs.names().map(str::to_string).collect();

    for name in names {
        let Some(spec) = fields.output(&name) else {
            warn!(task = %task, output = %name, "dropping undeclared output");
            outputs.remove(&name);
            continue;
        };

        if let Some(value) = outputs.get(&name) {
            if value.value_type() != spec.value_type() {
                return Err(FailureCause::Execution(format!(
                    "output '{name}' has type {} but is declared as {}",
                    value.value_type(),
                    spec.value_type()
                )));
            }
        }
    }

    Ok(outputs)
}
