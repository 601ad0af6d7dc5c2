// src/schedule/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::declaration::TaskId;
use crate::schedule::task_info::ScheduledTask;

/// Structured result of a single scheduler "step".
///
/// Tests can drive the [`Scheduler`](crate::schedule::Scheduler) by hand and
/// make assertions about what each step changed.
#[derive(Debug, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked as failed in this step, the failing task first,
    /// then the dependents it took down.
    pub newly_failed: Vec<TaskId>,
    /// Nothing is ready or running any more; the run is over.
    pub quiescent: bool,
}

impl SchedulerStep {
    /// Ids of the newly scheduled tasks.
    pub fn scheduled_ids(&self) -> Vec<&str> {
        self.newly_scheduled.iter().map(|t| t.id.as_str()).collect()
    }
}
