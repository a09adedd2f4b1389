// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::chain::{ChainScheduler, ScheduledTask, SchedulerStep};
use crate::engine::{ChainOutcome, ChainStatus, Outcome};
use crate::types::Data;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Make this status visible to observers (handle and result store).
    PublishStatus(ChainStatus),
    /// Send these task attempts to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The chain reached a terminal state; stop the runtime.
    Finish(ChainOutcome),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

pub fn handle_start(scheduler: &mut ChainScheduler, input: Data) -> CoreStep {
    let before = scheduler.status();
    let step = scheduler.step_start(input);
    into_core_step(scheduler, before, step)
}

pub fn handle_task_completion(
    scheduler: &mut ChainScheduler,
    node: usize,
    slot: usize,
    attempt: u32,
    outcome: Outcome,
) -> CoreStep {
    let before = scheduler.status();
    let step = scheduler.step_completion(node, slot, attempt, outcome);
    into_core_step(scheduler, before, step)
}

pub fn handle_cancel(scheduler: &mut ChainScheduler) -> CoreStep {
    let before = scheduler.status();
    let step = scheduler.step_cancel();
    into_core_step(scheduler, before, step)
}

/// Translate a scheduler step into shell commands.
///
/// Status is published before tasks are dispatched so observers never see a
/// task of node N running while the chain still reports node N-1.
fn into_core_step(
    scheduler: &ChainScheduler,
    before: ChainStatus,
    step: SchedulerStep,
) -> CoreStep {
    let mut commands = Vec::new();

    let after = scheduler.status();
    if after != before {
        commands.push(CoreCommand::PublishStatus(after));
    }

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    let keep_running = match step.finished {
        Some(outcome) => {
            commands.push(CoreCommand::Finish(outcome));
            false
        }
        None => !scheduler.is_finished(),
    };

    CoreStep {
        commands,
        keep_running,
    }
}
