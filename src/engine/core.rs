// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and produces the tasks the IO shell should
//! dispatch next, plus whether the run is still going. No channels, no Tokio
//! types, no IO; it can be driven by hand in tests.

use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::schedule::{RunReport, ScheduledTask, Scheduler};

/// Decision returned by the core after handling a single event.
#[derive(Debug, Default)]
pub struct CoreStep {
    /// Tasks the shell should hand to the executor.
    pub dispatch: Vec<ScheduledTask>,
    /// Whether the outer loop should keep waiting for events.
    pub keep_running: bool,
}

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Seed the run with every task that has no unresolved dependency.
    pub fn start(&mut self) -> CoreStep {
        let step = self.scheduler.start();
        CoreStep {
            dispatch: step.newly_scheduled,
            keep_running: !step.quiescent,
        }
    }

    /// Handle a single runtime event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskStarted { task } => {
                self.scheduler.handle_started(task.as_str());
                CoreStep {
                    dispatch: Vec::new(),
                    keep_running: !self.scheduler.is_quiescent(),
                }
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                let step = self.scheduler.handle_completion(task.as_str(), outcome);
                if !step.newly_failed.is_empty() {
                    debug!(failed = ?step.newly_failed, "core: tasks failed in this step");
                }
                CoreStep {
                    dispatch: step.newly_scheduled,
                    keep_running: !step.quiescent,
                }
            }
        }
    }

    pub fn outstanding(&self) -> usize {
        self.scheduler.outstanding()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn into_report(self) -> RunReport {
        self.scheduler.into_report()
    }
}
