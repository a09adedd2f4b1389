// tests/cancel_behaviour.rs

mod common;
use crate::common::fake_worker::{CallLog, Gate, gated, recording, retry_then_succeed};
use crate::common::{init_tracing, with_timeout};

use std::time::Duration;

use tokio::sync::watch;
use workchain::chain::{BoxFuture, Task, Worker, begin_with, begin_with_all};
use workchain::engine::{ChainOutcome, ChainStatus, Outcome};
use workchain::errors::WorkchainError;
use workchain::exec::{ChainHandle, Executor, ExecutorConfig};
use workchain::types::Data;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Let any stray background work run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn cancel_while_node_runs_skips_remaining_nodes() -> TestResult {
    init_tracing();
    let gate = Gate::new();
    let first = CallLog::new();
    let second = CallLog::new();

    let chain = begin_with(gated("first", &gate, &first, Outcome::empty()))
        .then(recording("second", &second))
        .build()?;

    let executor = Executor::default();
    let handle = executor.enqueue(chain, Data::new());

    with_timeout(gate.wait_started(1)).await;
    assert_eq!(handle.status(), ChainStatus::Running { node: 0 });

    handle.cancel();
    gate.release(1);

    let outcome = with_timeout(handle.await_result()).await?;
    assert_eq!(outcome, ChainOutcome::Cancelled);
    assert_eq!(first.count(), 1, "in-flight task ran to completion");
    assert_eq!(second.count(), 0, "next node never started");
    assert_eq!(executor.store().get_status(handle.id()), Some(ChainStatus::Cancelled));
    Ok(())
}

#[tokio::test]
async fn cancel_before_start_runs_nothing() -> TestResult {
    init_tracing();
    let log = CallLog::new();

    let chain = begin_with(recording("first", &log))
        .then(recording("second", &log))
        .build()?;

    let executor = Executor::default();
    let handle = executor.enqueue(chain, Data::new());
    // The current-thread runtime has not polled the chain yet.
    handle.cancel();

    let outcome = with_timeout(handle.await_result()).await?;
    assert_eq!(outcome, ChainOutcome::Cancelled);
    assert_eq!(log.count(), 0);
    assert!(handle.is_cancel_requested());
    Ok(())
}

#[tokio::test]
async fn retry_after_cancel_is_not_rerun() -> TestResult {
    init_tracing();
    let gate = Gate::new();
    let flaky = CallLog::new();
    let after = CallLog::new();

    let chain = begin_with(gated("flaky", &gate, &flaky, Outcome::retry()))
        .then(recording("after", &after))
        .build()?;

    let executor = Executor::default();
    let handle = executor.enqueue(chain, Data::new());

    with_timeout(gate.wait_started(1)).await;
    handle.cancel();
    gate.release(1);

    let outcome = with_timeout(handle.await_result()).await?;
    assert_eq!(outcome, ChainOutcome::Cancelled);
    assert_eq!(flaky.count(), 1);
    assert_eq!(after.count(), 0);
    Ok(())
}

#[tokio::test]
async fn failure_while_draining_after_cancel_fails_the_chain() -> TestResult {
    init_tracing();
    let gate = Gate::new();
    let log = CallLog::new();

    let chain = begin_with_all(vec![
        gated("ok", &gate, &log, Outcome::empty()),
        gated("bad", &gate, &log, Outcome::failure("late failure")),
    ])
    .then(recording("after", &log))
    .build()?;

    let executor = Executor::default();
    let handle = executor.enqueue(chain, Data::new());

    with_timeout(gate.wait_started(2)).await;
    handle.cancel();
    gate.release(2);

    let outcome = with_timeout(handle.await_result()).await?;
    match outcome {
        ChainOutcome::Failed(failure) => assert_eq!(failure.task, "bad"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(log.count(), 2);
    Ok(())
}

#[tokio::test]
async fn cancel_after_completion_is_a_no_op() -> TestResult {
    init_tracing();
    let log = CallLog::new();

    let chain = begin_with(recording("only", &log)).build()?;
    let executor = Executor::default();
    let handle = executor.enqueue(chain, Data::new());

    let outcome = with_timeout(handle.await_result()).await?;
    handle.cancel();
    handle.cancel();
    settle().await;

    assert_eq!(outcome, ChainOutcome::Succeeded(Data::new()));
    assert_eq!(handle.status(), ChainStatus::Succeeded(Data::new()));
    assert_eq!(with_timeout(handle.await_result()).await?, outcome);
    Ok(())
}

#[tokio::test]
async fn cancelled_outcome_converts_into_cancelled_error() -> TestResult {
    init_tracing();
    let log = CallLog::new();

    let chain = begin_with(recording("only", &log)).build()?;
    let executor = Executor::default();
    let handle = executor.enqueue(chain, Data::new());
    handle.cancel();

    let err = with_timeout(handle.await_result())
        .await?
        .into_result()
        .expect_err("cancelled chain has no output");
    assert!(matches!(err, WorkchainError::Cancelled));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_one_chain_leaves_others_running() -> TestResult {
    init_tracing();
    let gate_a = Gate::new();
    let gate_b = Gate::new();
    let log_a = CallLog::new();
    let log_b = CallLog::new();
    let after_a = CallLog::new();
    let after_b = CallLog::new();

    let chain_a = begin_with(gated("a", &gate_a, &log_a, Outcome::empty()))
        .then(recording("after_a", &after_a))
        .build()?;
    let chain_b = begin_with(gated("b", &gate_b, &log_b, Outcome::empty()))
        .then(recording("after_b", &after_b))
        .build()?;

    let executor = Executor::default();
    let handle_a = executor.enqueue(chain_a, Data::new());
    let handle_b = executor.enqueue(chain_b, Data::new());

    with_timeout(gate_a.wait_started(1)).await;
    with_timeout(gate_b.wait_started(1)).await;

    handle_a.cancel();
    gate_a.release(1);
    gate_b.release(1);

    assert_eq!(with_timeout(handle_a.await_result()).await?, ChainOutcome::Cancelled);
    assert_eq!(
        with_timeout(handle_b.await_result()).await?,
        ChainOutcome::Succeeded(Data::new())
    );
    assert_eq!(after_a.count(), 0);
    assert_eq!(after_b.count(), 1);
    Ok(())
}

/// Worker that cancels its own chain, then succeeds. The cancel and the
/// node's completion reach the runtime back to back.
struct CancelsOwnChain {
    handle: watch::Receiver<Option<ChainHandle>>,
    log: CallLog,
}

impl Worker for CancelsOwnChain {
    fn run(&self, input: Data) -> BoxFuture<'_, Outcome> {
        Box::pin(async move {
            self.log.record(input);
            let mut rx = self.handle.clone();
            if let Ok(slot) = rx.wait_for(Option::is_some).await {
                if let Some(handle) = slot.as_ref() {
                    handle.cancel();
                }
            }
            Outcome::empty()
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_racing_the_last_completion_never_starts_next_node() -> TestResult {
    init_tracing();
    let executor = Executor::default();

    for _ in 0..200 {
        let first = CallLog::new();
        let second = CallLog::new();
        let (handle_tx, handle_rx) = watch::channel(None);

        let chain = begin_with(Task::new(
            "first",
            CancelsOwnChain {
                handle: handle_rx,
                log: first.clone(),
            },
        ))
        .then(recording("second", &second))
        .build()?;

        let handle = executor.enqueue(chain, Data::new());
        handle_tx.send_replace(Some(handle.clone()));

        let outcome = with_timeout(handle.await_result()).await?;
        assert_eq!(outcome, ChainOutcome::Cancelled);
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 0, "next node started after cancel");
    }
    Ok(())
}

#[tokio::test]
async fn cancel_during_retry_delay_skips_the_retry() -> TestResult {
    init_tracing();
    let flaky = CallLog::new();
    let after = CallLog::new();

    let chain = begin_with(retry_then_succeed("flaky", &flaky, 1))
        .then(recording("after", &after))
        .build()?;

    let executor = Executor::new(ExecutorConfig {
        retry_delay: Duration::from_secs(2),
        ..ExecutorConfig::default()
    });
    let handle = executor.enqueue(chain, Data::new());

    with_timeout(async {
        while flaky.count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    // Retry is now dispatched and waiting out its delay.
    settle().await;
    handle.cancel();

    let started = tokio::time::Instant::now();
    let outcome = with_timeout(handle.await_result()).await?;
    assert_eq!(outcome, ChainOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(1), "retry delay was not cut short");
    assert_eq!(flaky.count(), 1, "retry never ran");
    assert_eq!(after.count(), 0);
    Ok(())
}
