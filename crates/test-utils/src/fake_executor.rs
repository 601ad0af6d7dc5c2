use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use dagschedule::engine::RuntimeEvent;
use dagschedule::errors::Result;
use dagschedule::exec::{ExecutorBackend, execute_task};
use dagschedule::schedule::ScheduledTask;
use tokio::sync::mpsc;

/// Capacity of [`FakeExecutor::channel`]. The fake sends two events per task
/// while the runtime is still awaiting the dispatch, so the buffer must hold
/// a whole wave.
pub const FAKE_EVENT_BUFFER: usize = 1024;

/// A fake executor that:
/// - records which tasks were dispatched, in order
/// - runs each task inline on the runtime's thread
/// - immediately reports `TaskStarted` and `TaskCompleted` for it.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
        }
    }

    /// A fake wired to a fresh event channel, plus its dispatch record.
    pub fn channel() -> (Self, mpsc::Receiver<RuntimeEvent>, Arc<Mutex<Vec<String>>>) {
        let (tx, rx) = mpsc::channel(FAKE_EVENT_BUFFER);
        let executed = Arc::new(Mutex::new(Vec::new()));
        (Self::new(tx, Arc::clone(&executed)), rx, executed)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                let task = t.id.clone();
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(task.to_string());
                }

                tx.send(RuntimeEvent::TaskStarted { task: task.clone() })
                    .await
                    .map_err(anyhow::Error::from)?;

                let outcome = execute_task(t);

                tx.send(RuntimeEvent::TaskCompleted { task, outcome })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
