use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use workchain::chain::{ScheduledTask, TaskId};
use workchain::engine::{Outcome, RuntimeEvent};
use workchain::errors::Result;
use workchain::exec::ExecutorBackend;
use workchain::types::Data;

/// A fake executor that:
/// - records which task attempts were "run", with the input they received
/// - never calls the task's worker
/// - immediately reports `TaskCompleted` for each attempt, using a scripted
///   outcome per task name (empty success by default).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<ExecutedAttempt>>>,
    outcomes: HashMap<String, Outcome>,
}

/// One attempt seen by [`FakeExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutedAttempt {
    pub id: TaskId,
    pub attempt: u32,
    pub input: Data,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<ExecutedAttempt>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: HashMap::new(),
        }
    }

    /// Report `outcome` for every attempt of tasks named `task`.
    pub fn with_outcome(mut self, task: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let outcomes = self.outcomes.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(ExecutedAttempt {
                        id: t.id(),
                        attempt: t.attempt,
                        input: t.input.clone(),
                    });
                }

                let outcome = outcomes.get(&t.name).cloned().unwrap_or_else(Outcome::empty);

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    node: t.node,
                    slot: t.slot,
                    attempt: t.attempt,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
