// tests/result_store.rs

mod common;
use crate::common::fake_worker::{CallLog, recording};
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workchain::chain::{TaskId, begin_with};
use workchain::engine::{ChainStatus, Outcome};
use workchain::exec::{Executor, ExecutorConfig};
use workchain::store::ResultStore;
use workchain::types::{ChainId, Data};

fn task_id(name: &str, node: usize) -> TaskId {
    TaskId {
        name: name.to_string(),
        node,
        slot: 0,
    }
}

#[test]
fn registered_chain_starts_pending() {
    init_tracing();
    let store = ResultStore::default();
    let id = ChainId::new();

    assert_eq!(store.get_status(id), None);
    store.register(id);
    assert_eq!(store.get_status(id), Some(ChainStatus::Pending));
    assert_eq!(store.len(), 1);
}

#[test]
fn records_keep_insertion_order() {
    init_tracing();
    let store = ResultStore::default();
    let id = ChainId::new();
    store.register(id);

    store.record_outcome(id, task_id("a", 0), 1, Outcome::retry());
    store.record_outcome(id, task_id("a", 0), 2, Outcome::empty());
    store.record_outcome(id, task_id("b", 1), 1, Outcome::failure("boom"));

    let records = store.records(id);
    let summary: Vec<_> = records
        .iter()
        .map(|r| (r.task.name.as_str(), r.attempt, r.outcome.kind()))
        .collect();
    assert_eq!(
        summary,
        vec![("a", 1, "retry"), ("a", 2, "success"), ("b", 1, "failure")]
    );
    assert!(records.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
}

#[test]
fn unknown_chain_is_ignored() {
    init_tracing();
    let store = ResultStore::default();
    let id = ChainId::new();

    store.record_outcome(id, task_id("a", 0), 1, Outcome::empty());
    store.set_status(id, ChainStatus::Cancelled);

    assert!(store.records(id).is_empty());
    assert_eq!(store.get_status(id), None);
    assert!(store.is_empty());
}

#[test]
fn terminal_status_is_never_overwritten() {
    init_tracing();
    let store = ResultStore::default();
    let id = ChainId::new();
    store.register(id);

    store.set_status(id, ChainStatus::Running { node: 0 });
    store.set_status(id, ChainStatus::Cancelled);
    store.set_status(id, ChainStatus::Running { node: 1 });
    store.set_status(id, ChainStatus::Succeeded(Data::new()));

    assert_eq!(store.get_status(id), Some(ChainStatus::Cancelled));
}

#[test]
fn purge_removes_the_entry() {
    init_tracing();
    let store = ResultStore::default();
    let id = ChainId::new();
    store.register(id);
    store.record_outcome(id, task_id("a", 0), 1, Outcome::empty());

    assert!(store.purge(id));
    assert!(!store.purge(id));
    assert_eq!(store.get_status(id), None);
    assert!(store.records(id).is_empty());
}

#[test]
fn finished_chains_expire_after_ttl() {
    init_tracing();
    let store = ResultStore::new(Some(Duration::from_millis(20)));
    let finished = ChainId::new();
    let running = ChainId::new();
    store.register(finished);
    store.register(running);

    store.set_status(finished, ChainStatus::Succeeded(Data::new()));
    store.set_status(running, ChainStatus::Running { node: 0 });
    assert!(store.get_status(finished).is_some());

    thread::sleep(Duration::from_millis(50));

    assert_eq!(store.get_status(finished), None, "expired entries are hidden");
    assert_eq!(
        store.get_status(running),
        Some(ChainStatus::Running { node: 0 }),
        "running chains never expire"
    );

    assert_eq!(store.purge_expired(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn without_ttl_nothing_expires() {
    init_tracing();
    let store = ResultStore::default();
    let id = ChainId::new();
    store.register(id);
    store.set_status(id, ChainStatus::Cancelled);

    thread::sleep(Duration::from_millis(10));
    assert_eq!(store.purge_expired(), 0);
    assert_eq!(store.get_status(id), Some(ChainStatus::Cancelled));
}

#[test]
fn concurrent_recording_from_many_threads() {
    init_tracing();
    let store = Arc::new(ResultStore::default());
    let ids: Vec<_> = (0..4).map(|_| ChainId::new()).collect();
    for id in &ids {
        store.register(*id);
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for attempt in 1..=50 {
                    store.record_outcome(id, task_id("t", 0), attempt, Outcome::empty());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("recorder thread panicked");
    }

    for id in &ids {
        let attempts: Vec<_> = store.records(*id).iter().map(|r| r.attempt).collect();
        assert_eq!(attempts, (1..=50).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn executor_purges_expired_chains_on_enqueue() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let log = CallLog::new();

    let executor = Executor::new(ExecutorConfig {
        result_ttl: Some(Duration::from_millis(20)),
        ..ExecutorConfig::default()
    });

    let first = executor.enqueue(begin_with(recording("a", &log)).build()?, Data::new());
    with_timeout(first.await_result()).await?;
    assert_eq!(executor.store().len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = executor.enqueue(begin_with(recording("b", &log)).build()?, Data::new());
    assert_eq!(executor.store().get_status(first.id()), None);
    assert_eq!(executor.store().len(), 1, "only the new chain is tracked");

    with_timeout(second.await_result()).await?;
    // The handle still reports the outcome after the store forgot it.
    assert!(first.status().is_terminal());
    Ok(())
}
