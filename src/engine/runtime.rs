// src/engine/runtime.rs

use std::fmt;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{Result, ScheduleError};
use crate::exec::ExecutorBackend;
use crate::schedule::{RunReport, ScheduledTask, Scheduler};

use super::RuntimeEvent;
use super::core::CoreRuntime;

/// Drives the scheduler in response to `RuntimeEvent`s and delegates the
/// actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// run semantics. Events are handled strictly one at a time, so a
/// producer's outputs are recorded before any consumer is re-evaluated.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(scheduler: Scheduler, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core: CoreRuntime::new(scheduler),
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches the initial ready set.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them to the core.
    /// - Dispatches whatever became ready.
    /// - Returns the report once nothing is ready or running.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("schedule runtime started");

        let step = self.core.start();
        self.spawn_ready(step.dispatch).await?;
        let mut keep_running = step.keep_running;

        while keep_running {
            let Some(event) = self.event_rx.recv().await else {
                warn!(
                    outstanding = self.core.outstanding(),
                    "runtime event channel closed with tasks outstanding"
                );
                return Err(ScheduleError::Other(anyhow!(
                    "executor event channel closed with {} task(s) outstanding",
                    self.core.outstanding()
                )));
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            self.spawn_ready(step.dispatch).await?;
            keep_running = step.keep_running;
        }

        let report = self.core.into_report();
        info!(
            success = report.is_success(),
            failures = report.failures().len(),
            unsatisfied = report.unsatisfied().len(),
            "runtime exiting"
        );
        Ok(report)
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        debug!(?ids, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
