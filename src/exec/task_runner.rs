// src/exec/task_runner.rs

//! Individual task attempt runner.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::ScheduledTask;
use crate::engine::{FailureReason, Outcome, RuntimeEvent};

/// Run a single task attempt and report a `TaskCompleted` event.
///
/// - Waits for the retry delay and a concurrency permit first.
/// - A retry whose chain is cancelled before it starts reports `Retry`
///   without running the worker; the scheduler then abandons the slot.
/// - A timeout aborts the attempt and reports `Failure(Timeout)`.
/// - A panicking worker is reported as `Failure(Panicked)`.
/// - If the runtime already stopped listening (chain finished), the outcome is
///   dropped.
pub async fn run_task(
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    permits: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
) {
    if task.attempt > 1 {
        if !task.delay.is_zero() {
            debug!(task = %task.name, attempt = task.attempt, delay = ?task.delay, "delaying attempt");
            tokio::select! {
                _ = tokio::time::sleep(task.delay) => {}
                _ = cancel.cancelled() => {}
            }
        }

        if cancel.is_cancelled() {
            info!(
                chain_id = %task.chain_id,
                task = %task.name,
                attempt = task.attempt,
                "chain cancelled; retry not started"
            );
            report(&task, Outcome::Retry, &runtime_tx).await;
            return;
        }
    }

    // Held until the attempt finishes.
    let _permit = match permits {
        Some(sem) => match sem.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                warn!(task = %task.name, "concurrency limiter closed; running without a permit");
                None
            }
        },
        None => None,
    };

    info!(
        chain_id = %task.chain_id,
        task = %task.name,
        node = task.node,
        attempt = task.attempt,
        "starting task attempt"
    );

    let outcome = run_attempt(&task).await;

    info!(
        chain_id = %task.chain_id,
        task = %task.name,
        node = task.node,
        attempt = task.attempt,
        outcome = outcome.kind(),
        "task attempt finished"
    );

    report(&task, outcome, &runtime_tx).await;
}

async fn report(task: &ScheduledTask, outcome: Outcome, runtime_tx: &mpsc::Sender<RuntimeEvent>) {
    let event = RuntimeEvent::TaskCompleted {
        task: task.name.clone(),
        node: task.node,
        slot: task.slot,
        attempt: task.attempt,
        outcome,
    };

    if runtime_tx.send(event).await.is_err() {
        debug!(
            chain_id = %task.chain_id,
            task = %task.name,
            "chain runtime no longer listening; outcome discarded"
        );
    }
}

async fn run_attempt(task: &ScheduledTask) -> Outcome {
    let worker = Arc::clone(&task.worker);
    let input = task.input.clone();
    let mut handle = tokio::spawn(async move { worker.run(input).await });

    let joined = match task.timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                warn!(
                    chain_id = %task.chain_id,
                    task = %task.name,
                    timeout = ?limit,
                    "task attempt timed out; aborting"
                );
                return Outcome::Failure(FailureReason::Timeout(limit));
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic());
            warn!(task = %task.name, panic = %message, "worker panicked");
            Outcome::Failure(FailureReason::Panicked(message))
        }
        Err(e) => Outcome::Failure(FailureReason::Panicked(e.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
