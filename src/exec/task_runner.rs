// src/exec/task_runner.rs

//! Individual task runner.

use std::any::Any;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::declaration::TaskId;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::schedule::ScheduledTask;
use crate::schedule::report::FailureCause;

/// Run a single scheduled task on the blocking pool and report back.
///
/// - Waits for a permit when the pool is bounded.
/// - Sends `TaskStarted` once it holds the permit, then `TaskCompleted`
///   with the outcome. A panic inside the task becomes
///   [`FailureCause::Panicked`].
pub async fn run_task(
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    permits: Option<Arc<Semaphore>>,
) {
    let id = task.id.clone();

    let _permit = match permits {
        Some(sem) => match sem.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(err) => {
                error!(task = %id, error = %err, "worker pool closed before task could start");
                send_completed(
                    &runtime_tx,
                    id,
                    TaskOutcome::Failed(FailureCause::Execution(format!(
                        "worker pool closed: {err}"
                    ))),
                )
                .await;
                return;
            }
        },
        None => None,
    };

    if runtime_tx
        .send(RuntimeEvent::TaskStarted { task: id.clone() })
        .await
        .is_err()
    {
        warn!(task = %id, "runtime gone before task started; dropping task");
        return;
    }

    info!(task = %id, "starting task");

    let outcome = match tokio::task::spawn_blocking(move || execute_task(task)).await {
        Ok(outcome) => outcome,
        Err(join_err) if join_err.is_panic() => {
            let message = panic_message(join_err.into_panic());
            error!(task = %id, panic = %message, "task panicked");
            TaskOutcome::Failed(FailureCause::Panicked(message))
        }
        Err(join_err) => {
            error!(task = %id, error = %join_err, "task worker was cancelled");
            TaskOutcome::Failed(FailureCause::Execution(join_err.to_string()))
        }
    };

    send_completed(&runtime_tx, id, outcome).await;
}

/// Feed inputs, run, and collect outputs. Synchronous; may block.
pub fn execute_task(task: ScheduledTask) -> TaskOutcome {
    let ScheduledTask {
        id,
        mut instance,
        inputs,
    } = task;

    let result = (|| -> anyhow::Result<()> {
        for (field, value) in inputs {
            instance
                .set_input(&field, value)
                .with_context(|| format!("setting input '{field}' of task '{id}'"))?;
        }
        instance
            .run()
            .with_context(|| format!("running task '{id}'"))
    })();

    match result {
        Ok(()) => {
            let outputs = instance.take_outputs();
            debug!(task = %id, outputs = outputs.len(), "task finished");
            TaskOutcome::Success(outputs)
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(task = %id, error = %message, "task returned an error");
            TaskOutcome::Failed(FailureCause::Execution(message))
        }
    }
}

async fn send_completed(runtime_tx: &mpsc::Sender<RuntimeEvent>, task: TaskId, outcome: TaskOutcome) {
    let success = outcome.is_success();
    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.clone(),
            outcome,
        })
        .await
    {
        warn!(task = %task, success, error = %err, "failed to report task completion");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
