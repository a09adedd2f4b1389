// src/chain/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::chain::task_info::ScheduledTask;
use crate::engine::ChainOutcome;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step a chain and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Task attempts that should be dispatched now (new node or retries).
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Index of the node this step entered, if any.
    pub node_started: Option<usize>,
    /// Set when this step moved the chain into a terminal state.
    pub finished: Option<ChainOutcome>,
}

impl SchedulerStep {
    pub fn is_empty(&self) -> bool {
        self.newly_scheduled.is_empty() && self.node_started.is_none() && self.finished.is_none()
    }
}
