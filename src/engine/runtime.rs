// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{ScheduledTask, TaskId};
use crate::errors::{Result, WorkchainError};
use crate::exec::ExecutorBackend;
use crate::store::ResultStore;
use crate::types::Data;

use super::core::CoreRuntime;
use super::{ChainOutcome, ChainStatus, CoreCommand, RuntimeEvent};

/// Drives one chain's scheduler in response to `RuntimeEvent`s, and
/// delegates task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// chain semantics. This struct handles async IO: reading events from
/// channels, watching the cancellation token, recording outcomes and
/// dispatching tasks to the executor. It is the only writer of the chain's
/// status.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    store: Arc<ResultStore>,
    status_tx: watch::Sender<ChainStatus>,
    cancel: CancellationToken,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        store: Arc<ResultStore>,
        status_tx: watch::Sender<ChainStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            store,
            status_tx,
            cancel,
        }
    }

    /// Main event loop.
    ///
    /// - Starts the chain with `input` (or cancels it if cancellation was
    ///   requested before the runtime got scheduled).
    /// - Consumes `RuntimeEvent`s from `event_rx` and the cancellation token.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core until the chain is terminal.
    pub async fn run(mut self, input: Data) -> Result<ChainOutcome> {
        let chain_id = self.core.chain_id();
        info!(chain_id = %chain_id, "chain runtime started");

        let mut backlog = VecDeque::new();
        let mut cancel_seen = self.cancel.is_cancelled();
        if cancel_seen {
            backlog.push_back(RuntimeEvent::CancelRequested);
        }
        backlog.push_back(RuntimeEvent::Started { input });

        loop {
            let mut event = match backlog.pop_front() {
                Some(e) => e,
                None => {
                    tokio::select! {
                        biased;

                        _ = self.cancel.cancelled(), if !cancel_seen => {
                            cancel_seen = true;
                            RuntimeEvent::CancelRequested
                        }
                        received = self.event_rx.recv() => match received {
                            Some(e) => e,
                            None => {
                                warn!(chain_id = %chain_id, "runtime event channel closed before chain finished");
                                return Err(WorkchainError::ExecutorStopped(chain_id));
                            }
                        }
                    }
                }
            };

            // A cancel issued before this event was sent must be applied
            // first, otherwise a completion could open the next node.
            if !cancel_seen && self.cancel.is_cancelled() {
                cancel_seen = true;
                backlog.push_front(event);
                event = RuntimeEvent::CancelRequested;
            }

            debug!(chain_id = %chain_id, ?event, "runtime received event");

            if let RuntimeEvent::TaskCompleted {
                task,
                node,
                slot,
                attempt,
                outcome,
            } = &event
            {
                if !self.core.is_finished() {
                    let id = TaskId {
                        name: task.clone(),
                        node: *node,
                        slot: *slot,
                    };
                    self.store
                        .record_outcome(chain_id, id, *attempt, outcome.clone());
                }
            }

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);

            let mut finished = None;
            for command in step.commands {
                if let Some(outcome) = self.execute_command(command).await? {
                    finished = Some(outcome);
                }
            }

            if let Some(outcome) = finished {
                info!(chain_id = %chain_id, "chain runtime exiting");
                return Ok(outcome);
            }

            if !step.keep_running {
                // The core only stops after emitting `Finish`.
                warn!(chain_id = %chain_id, "core stopped without a terminal outcome");
                return Err(WorkchainError::ExecutorStopped(chain_id));
            }
        }
    }

    /// Execute a single command from the core. Returns the outcome when the
    /// command finishes the chain.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<Option<ChainOutcome>> {
        match command {
            CoreCommand::PublishStatus(status) => {
                self.publish(status);
                Ok(None)
            }
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
                Ok(None)
            }
            CoreCommand::Finish(outcome) => {
                // Status was already published by the preceding command; make
                // sure observers see it even if the core skipped it.
                self.publish(outcome.clone().into());
                Ok(Some(outcome))
            }
        }
    }

    fn publish(&self, status: ChainStatus) {
        let chain_id = self.core.chain_id();
        debug!(chain_id = %chain_id, status = status.label(), "publishing chain status");
        self.store.set_status(chain_id, status.clone());
        self.status_tx.send_if_modified(|current| {
            if current.is_terminal() || *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        {
            let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
            let attempts: Vec<_> = tasks.iter().map(|t| t.attempt).collect();
            debug!(?names, ?attempts, "spawning ready tasks");
        }

        self.executor.spawn_ready_tasks(tasks).await
    }
}
