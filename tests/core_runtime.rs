// tests/core_runtime.rs
//
// The pure core is driven directly: no Tokio, no channels, no workers.

mod common;
use crate::common::fake_worker::{CallLog, data, recording, succeed_with};
use crate::common::init_tracing;

use workchain::chain::{ChainScheduler, ScheduledTask, SchedulerOptions, TaskRunState, begin_with, begin_with_all};
use workchain::engine::{ChainOutcome, ChainStatus, CoreCommand, CoreRuntime, CoreStep, Outcome, RuntimeEvent};
use workchain::types::{ChainId, Data};

fn core_for(chain: workchain::chain::Chain) -> CoreRuntime {
    CoreRuntime::new(ChainScheduler::new(
        ChainId::new(),
        chain,
        SchedulerOptions::default(),
    ))
}

fn dispatched(step: &CoreStep) -> Vec<ScheduledTask> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => Some(tasks.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn published(step: &CoreStep) -> Vec<ChainStatus> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::PublishStatus(status) => Some(status.clone()),
            _ => None,
        })
        .collect()
}

fn finished(step: &CoreStep) -> Option<ChainOutcome> {
    step.commands.iter().find_map(|c| match c {
        CoreCommand::Finish(outcome) => Some(outcome.clone()),
        _ => None,
    })
}

fn completed(task: &ScheduledTask, outcome: Outcome) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.name.clone(),
        node: task.node,
        slot: task.slot,
        attempt: task.attempt,
        outcome,
    }
}

#[test]
fn start_publishes_running_then_dispatches_first_node() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with(recording("a", &log))
        .then(recording("b", &log))
        .build()
        .unwrap();
    let mut core = core_for(chain);

    let step = core.step(RuntimeEvent::Started {
        input: data(&[("seed", "1")]),
    });

    assert!(step.keep_running);
    assert!(matches!(step.commands[0], CoreCommand::PublishStatus(ChainStatus::Running { node: 0 })));
    let tasks = dispatched(&step);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "a");
    assert_eq!(tasks[0].attempt, 1);
    assert_eq!(tasks[0].input, data(&[("seed", "1")]));
}

#[test]
fn barrier_waits_for_every_parallel_task() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with_all(vec![
        succeed_with("left", &log, &[("l", "1")]),
        succeed_with("right", &log, &[("r", "2")]),
    ])
    .then(recording("join", &log))
    .build()
    .unwrap();
    let mut core = core_for(chain);

    let first = dispatched(&core.step(RuntimeEvent::Started { input: Data::new() }));
    assert_eq!(first.len(), 2);

    let step = core.step(completed(&first[1], Outcome::success(data(&[("r", "2")]))));
    assert!(dispatched(&step).is_empty(), "node 0 still has a running task");
    assert!(published(&step).is_empty());
    assert_eq!(
        core.scheduler().run_state_of(0, 1),
        Some(TaskRunState::DoneSuccess)
    );
    assert_eq!(core.scheduler().run_state_of(0, 0), Some(TaskRunState::Running));

    let step = core.step(completed(&first[0], Outcome::success(data(&[("l", "1")]))));
    assert_eq!(published(&step), vec![ChainStatus::Running { node: 1 }]);
    let next = dispatched(&step);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].input, data(&[("l", "1"), ("r", "2")]));
    assert_eq!(core.scheduler().run_state_of(0, 0), Some(TaskRunState::NotInRun));
}

#[test]
fn stale_and_duplicate_completions_are_ignored() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with(recording("a", &log))
        .then(recording("b", &log))
        .build()
        .unwrap();
    let mut core = core_for(chain);

    let first = dispatched(&core.step(RuntimeEvent::Started { input: Data::new() }));
    let a = first[0].clone();

    // Wrong attempt number.
    let mut stale = a.clone();
    stale.attempt = 7;
    let step = core.step(completed(&stale, Outcome::failure("ghost")));
    assert!(step.commands.is_empty());
    assert!(step.keep_running);

    let step = core.step(completed(&a, Outcome::empty()));
    assert_eq!(dispatched(&step).len(), 1);

    // Same completion again: node 0 is no longer active.
    let step = core.step(completed(&a, Outcome::failure("late")));
    assert!(step.commands.is_empty());
    assert_eq!(core.scheduler().current_node(), Some(1));
}

#[test]
fn retry_redispatches_same_slot_with_next_attempt() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with(recording("flaky", &log).with_input("uri", "a.png"))
        .build()
        .unwrap();
    let mut core = core_for(chain);

    let first = dispatched(&core.step(RuntimeEvent::Started { input: Data::new() }));
    let step = core.step(completed(&first[0], Outcome::retry()));

    assert!(published(&step).is_empty(), "status stays Running");
    let again = dispatched(&step);
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].slot, first[0].slot);
    assert_eq!(again[0].attempt, 2);
    assert_eq!(again[0].input, first[0].input);
    assert_eq!(core.scheduler().attempts_of(0), Some(2));
}

#[test]
fn cancel_while_running_drains_the_active_node() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with(recording("a", &log))
        .then(recording("b", &log))
        .build()
        .unwrap();
    let mut core = core_for(chain);

    let first = dispatched(&core.step(RuntimeEvent::Started { input: Data::new() }));

    let step = core.step(RuntimeEvent::CancelRequested);
    assert!(step.commands.is_empty(), "waits for the in-flight task");
    assert!(core.scheduler().cancel_requested());

    let step = core.step(completed(&first[0], Outcome::empty()));
    assert!(dispatched(&step).is_empty());
    assert_eq!(finished(&step), Some(ChainOutcome::Cancelled));
    assert_eq!(published(&step), vec![ChainStatus::Cancelled]);
    assert!(!step.keep_running);
}

#[test]
fn cancel_before_start_finishes_immediately() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with(recording("a", &log)).build().unwrap();
    let mut core = core_for(chain);

    let step = core.step(RuntimeEvent::CancelRequested);
    assert_eq!(finished(&step), Some(ChainOutcome::Cancelled));
    assert!(!step.keep_running);

    let step = core.step(RuntimeEvent::Started { input: Data::new() });
    assert!(step.commands.is_empty());
    assert!(core.is_finished());
}

#[test]
fn success_of_last_node_finishes_with_its_output() {
    init_tracing();
    let log = CallLog::new();
    let chain = begin_with(succeed_with("only", &log, &[("k", "v")]))
        .build()
        .unwrap();
    let mut core = core_for(chain);

    let first = dispatched(&core.step(RuntimeEvent::Started { input: Data::new() }));
    let step = core.step(completed(&first[0], Outcome::success(data(&[("k", "v")]))));

    let outcome = ChainOutcome::Succeeded(data(&[("k", "v")]));
    assert_eq!(finished(&step), Some(outcome.clone()));
    assert_eq!(core.scheduler().status(), ChainStatus::from(outcome));
}
