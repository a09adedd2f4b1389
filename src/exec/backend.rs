// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning Tokio tasks
//! itself. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation in [`task_runner`].
//!
//! - `TokioExecutorBackend` is the default implementation used by
//!   [`Executor`](super::Executor). It spawns one Tokio task per attempt.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.
//!
//! [`task_runner`]: super::task_runner

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::chain::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;

use super::task_runner::run_task;

/// Trait abstracting how scheduled task attempts are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given attempts for execution.
    ///
    /// Every dispatched attempt must eventually produce exactly one
    /// `RuntimeEvent::TaskCompleted` unless the runtime has already stopped
    /// listening.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: each attempt runs as its own Tokio task.
pub struct TokioExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    /// Executor-wide concurrency limit, shared across chains.
    permits: Option<Arc<Semaphore>>,
    /// The chain's cancellation token; pending retries give up when it fires.
    cancel: CancellationToken,
}

impl TokioExecutorBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        permits: Option<Arc<Semaphore>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runtime_tx,
            permits,
            cancel,
        }
    }
}

impl ExecutorBackend for TokioExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone shared handles so the future doesn't borrow `self` across `await`.
        let tx = self.runtime_tx.clone();
        let permits = self.permits.clone();
        let cancel = self.cancel.clone();

        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_task(task, tx.clone(), permits.clone(), cancel.clone()));
            }
            Ok(())
        })
    }
}
