// src/chain/scheduler.rs

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chain::Chain;
use crate::chain::scheduler_step::SchedulerStep;
use crate::chain::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{ChainOutcome, ChainStatus, FailureReason, Outcome, TaskFailure};
use crate::types::{ChainId, Data};

/// Knobs the scheduler needs from the executor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// How many times a task may be re-run after returning `Retry`.
    pub retry_limit: u32,
    /// Delay before each re-run.
    pub retry_delay: Duration,
    /// Timeout applied to tasks that do not set their own.
    pub task_timeout: Option<Duration>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            retry_delay: Duration::ZERO,
            task_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    NotStarted,
    Running { node: usize },
    Finished(ChainOutcome),
}

/// Scheduler holds one immutable chain plus its mutable run state.
///
/// It is responsible for:
/// - dispatching every task of a node at once, with the merged upstream data
/// - holding the barrier until every task of the active node is terminal
/// - re-dispatching tasks that ask for a retry, up to the retry limit
/// - failing the whole chain on the first task failure
/// - honouring cancellation between nodes
///
/// It performs no IO; the runtime feeds it events and executes the tasks it
/// returns.
#[derive(Debug)]
pub struct ChainScheduler {
    chain_id: ChainId,
    chain: Chain,
    options: SchedulerOptions,
    phase: Phase,
    /// Slots of the active node.
    slots: Vec<TaskInfo>,
    /// Input handed to the active node.
    upstream: Data,
    cancel_requested: bool,
}

impl ChainScheduler {
    pub fn new(chain_id: ChainId, chain: Chain, options: SchedulerOptions) -> Self {
        Self {
            chain_id,
            chain,
            options,
            phase: Phase::NotStarted,
            slots: Vec::new(),
            upstream: Data::new(),
            cancel_requested: false,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn status(&self) -> ChainStatus {
        match &self.phase {
            Phase::NotStarted => ChainStatus::Pending,
            Phase::Running { node } => ChainStatus::Running { node: *node },
            Phase::Finished(outcome) => outcome.clone().into(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    /// Index of the node currently running, if any.
    pub fn current_node(&self) -> Option<usize> {
        match &self.phase {
            Phase::Running { node } => Some(*node),
            _ => None,
        }
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Read-only view of a slot's state. Returns `None` for unknown positions.
    pub fn run_state_of(&self, node: usize, slot: usize) -> Option<TaskRunState> {
        self.chain.node(node)?.tasks().get(slot)?;

        if self.current_node() == Some(node) {
            Some(self.slots.get(slot)?.run_state.into())
        } else {
            Some(TaskRunState::NotInRun)
        }
    }

    /// Attempts made so far by a slot of the active node.
    pub fn attempts_of(&self, slot: usize) -> Option<u32> {
        self.current_node()?;
        self.slots.get(slot).map(|info| info.attempt)
    }

    /// Begin the chain: dispatch node 0 with the caller's input.
    pub fn step_start(&mut self, input: Data) -> SchedulerStep {
        if self.phase != Phase::NotStarted {
            warn!(chain_id = %self.chain_id, "start requested twice; ignoring");
            return SchedulerStep::default();
        }

        if self.cancel_requested {
            return self.finish(ChainOutcome::Cancelled);
        }

        info!(
            chain_id = %self.chain_id,
            nodes = self.chain.len(),
            tasks = self.chain.task_count(),
            "starting chain"
        );

        self.enter_node(0, input)
    }

    /// Apply the outcome of one task attempt.
    ///
    /// Outcomes for inactive nodes, superseded attempts or finished chains are
    /// discarded.
    pub fn step_completion(
        &mut self,
        node: usize,
        slot: usize,
        attempt: u32,
        outcome: Outcome,
    ) -> SchedulerStep {
        let active = match &self.phase {
            Phase::Running { node } => *node,
            Phase::NotStarted | Phase::Finished(_) => {
                debug!(
                    chain_id = %self.chain_id,
                    node,
                    slot,
                    outcome = outcome.kind(),
                    "completion while chain is not running; discarding output"
                );
                return SchedulerStep::default();
            }
        };

        if node != active {
            warn!(
                chain_id = %self.chain_id,
                node,
                active,
                "completion for inactive node; ignoring"
            );
            return SchedulerStep::default();
        }

        let retry_limit = self.options.retry_limit;
        let cancel_requested = self.cancel_requested;

        let Some(info) = self.slots.get_mut(slot) else {
            warn!(chain_id = %self.chain_id, node, slot, "completion for unknown slot; ignoring");
            return SchedulerStep::default();
        };

        if info.attempt != attempt || info.run_state != Some(RunState::Running) {
            debug!(
                chain_id = %self.chain_id,
                task = %info.task.name(),
                attempt,
                current_attempt = info.attempt,
                "stale completion; ignoring"
            );
            return SchedulerStep::default();
        }

        match outcome {
            Outcome::Success(data) => {
                let output = filter_output(info.task.name(), info.task.outputs(), data);
                debug!(
                    chain_id = %self.chain_id,
                    task = %info.task.name(),
                    node,
                    attempt,
                    keys = output.len(),
                    "task succeeded"
                );
                info.run_state = Some(RunState::DoneSuccess);
                info.output = Some(output);
                self.maybe_finish_node()
            }
            Outcome::Failure(reason) => {
                info.run_state = Some(RunState::DoneFailed);
                let failure = TaskFailure {
                    task: info.task.name().to_string(),
                    node,
                    reason,
                };
                warn!(
                    chain_id = %self.chain_id,
                    attempt,
                    error = %failure,
                    "task failed; failing chain"
                );
                self.finish(ChainOutcome::Failed(failure))
            }
            Outcome::Retry if cancel_requested => {
                info!(
                    chain_id = %self.chain_id,
                    task = %info.task.name(),
                    node,
                    attempt,
                    "retry requested after cancellation; not re-running"
                );
                info.run_state = Some(RunState::Abandoned);
                self.maybe_finish_node()
            }
            Outcome::Retry => match next_attempt(info.attempt, retry_limit) {
                Some(attempt) => {
                    info.attempt = attempt;
                    warn!(
                        chain_id = %self.chain_id,
                        task = %info.task.name(),
                        node,
                        attempt,
                        retry_limit,
                        "task asked for retry; re-dispatching"
                    );
                    let scheduled = ScheduledTask::from_task_info(
                        self.chain_id,
                        node,
                        info,
                        &self.upstream,
                        self.options.task_timeout,
                        self.options.retry_delay,
                    );
                    SchedulerStep {
                        newly_scheduled: vec![scheduled],
                        ..SchedulerStep::default()
                    }
                }
                None => {
                    info.run_state = Some(RunState::DoneFailed);
                    let failure = TaskFailure {
                        task: info.task.name().to_string(),
                        node,
                        reason: FailureReason::RetryExhausted {
                            attempts: info.attempt,
                        },
                    };
                    warn!(chain_id = %self.chain_id, error = %failure, "retries exhausted");
                    self.finish(ChainOutcome::Failed(failure))
                }
            },
        }
    }

    /// Request cooperative cancellation.
    ///
    /// A chain that has not started is cancelled at once. A running chain lets
    /// the active node's in-flight tasks finish and never starts the next node.
    pub fn step_cancel(&mut self) -> SchedulerStep {
        let node = match &self.phase {
            Phase::Finished(_) => {
                debug!(chain_id = %self.chain_id, "cancel after chain finished; ignoring");
                return SchedulerStep::default();
            }
            Phase::NotStarted => {
                self.cancel_requested = true;
                info!(chain_id = %self.chain_id, "chain cancelled before start");
                return self.finish(ChainOutcome::Cancelled);
            }
            Phase::Running { node } => *node,
        };

        if self.cancel_requested {
            return SchedulerStep::default();
        }
        self.cancel_requested = true;

        let in_flight = self
            .slots
            .iter()
            .filter(|info| info.run_state == Some(RunState::Running))
            .count();

        info!(
            chain_id = %self.chain_id,
            node,
            in_flight,
            "cancellation requested; letting in-flight tasks finish"
        );

        if in_flight == 0 {
            self.finish(ChainOutcome::Cancelled)
        } else {
            SchedulerStep::default()
        }
    }

    /// Advance past the active node once every slot is terminal.
    fn maybe_finish_node(&mut self) -> SchedulerStep {
        let node = match &self.phase {
            Phase::Running { node } => *node,
            _ => return SchedulerStep::default(),
        };

        let all_terminal = self
            .slots
            .iter()
            .all(|info| info.run_state.is_some_and(RunState::is_terminal));
        if !all_terminal {
            return SchedulerStep::default();
        }

        if self.cancel_requested {
            info!(
                chain_id = %self.chain_id,
                node,
                "node drained after cancellation; remaining nodes will not run"
            );
            return self.finish(ChainOutcome::Cancelled);
        }

        let mut merged = Data::new();
        for info in &self.slots {
            if let Some(output) = &info.output {
                merged.extend(output.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        info!(
            chain_id = %self.chain_id,
            node,
            keys = merged.len(),
            "node completed"
        );

        if node + 1 >= self.chain.len() {
            self.finish(ChainOutcome::Succeeded(merged))
        } else {
            self.enter_node(node + 1, merged)
        }
    }

    /// Make `node` the active node and dispatch all of its tasks.
    fn enter_node(&mut self, node: usize, upstream: Data) -> SchedulerStep {
        let tasks = match self.chain.node(node) {
            Some(n) => n.tasks().to_vec(),
            None => {
                warn!(chain_id = %self.chain_id, node, "node index out of range; finishing chain");
                return self.finish(ChainOutcome::Succeeded(upstream));
            }
        };

        self.slots = tasks
            .into_iter()
            .enumerate()
            .map(|(slot, task)| TaskInfo::new(task, slot))
            .collect();
        self.upstream = upstream;
        self.phase = Phase::Running { node };

        let mut scheduled = Vec::with_capacity(self.slots.len());
        for info in self.slots.iter_mut() {
            info.attempt = 1;
            info.run_state = Some(RunState::Running);
            scheduled.push(ScheduledTask::from_task_info(
                self.chain_id,
                node,
                info,
                &self.upstream,
                self.options.task_timeout,
                Duration::ZERO,
            ));
        }

        let names: Vec<_> = scheduled.iter().map(|t| t.name.as_str()).collect();
        info!(chain_id = %self.chain_id, node, tasks = ?names, "node started");

        SchedulerStep {
            newly_scheduled: scheduled,
            node_started: Some(node),
            finished: None,
        }
    }

    fn finish(&mut self, outcome: ChainOutcome) -> SchedulerStep {
        let status = ChainStatus::from(outcome.clone());
        info!(chain_id = %self.chain_id, status = status.label(), "chain finished");
        self.phase = Phase::Finished(outcome.clone());

        SchedulerStep {
            finished: Some(outcome),
            ..SchedulerStep::default()
        }
    }
}

/// Attempt number for a re-run after `attempt` asked for a retry, or `None`
/// once `retry_limit` re-runs were used (or the counter would overflow).
pub fn next_attempt(attempt: u32, retry_limit: u32) -> Option<u32> {
    if attempt <= retry_limit {
        attempt.checked_add(1)
    } else {
        None
    }
}

/// Keep only the keys a task declared; the rest never reach the next node.
fn filter_output(task: &str, declared: &BTreeSet<String>, data: Data) -> Data {
    data.into_iter()
        .filter(|(key, _)| {
            let keep = declared.contains(key);
            if !keep {
                warn!(task = %task, key = %key, "dropping undeclared output key");
            }
            keep
        })
        .collect()
}
