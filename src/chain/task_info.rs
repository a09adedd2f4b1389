// src/chain/task_info.rs

//! Per-slot task state and scheduled task types.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::task::{Task, Worker};
use crate::types::{ChainId, Data, TaskName};

/// Per-run state of a task slot (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Dispatched to the executor and not yet reported back.
    Running,
    /// Reported success for this node.
    DoneSuccess,
    /// Reported failure, or ran out of retries.
    DoneFailed,
    /// Asked for a retry after cancellation was requested; not re-run.
    Abandoned,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Running)
    }
}

/// Public, read-only view of a slot's run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The slot's node is not the active node.
    NotInRun,
    Running,
    DoneSuccess,
    DoneFailed,
    Abandoned,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Abandoned) => TaskRunState::Abandoned,
        }
    }
}

/// Position of a task inside a chain, plus its name for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub name: TaskName,
    pub node: usize,
    pub slot: usize,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}.{}]", self.name, self.node, self.slot)
    }
}

/// Mutable state of one task of the active node.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub task: Task,
    pub slot: usize,
    /// 1-based attempt number of the latest dispatch.
    pub attempt: u32,
    pub run_state: Option<RunState>,
    /// Contract-filtered output, set on success.
    pub output: Option<Data>,
}

impl TaskInfo {
    pub fn new(task: Task, slot: usize) -> Self {
        Self {
            task,
            slot,
            attempt: 0,
            run_state: None,
            output: None,
        }
    }
}

/// Description of a task attempt that the scheduler wants the executor to run.
#[derive(Clone)]
pub struct ScheduledTask {
    pub chain_id: ChainId,
    pub name: TaskName,
    pub node: usize,
    pub slot: usize,
    pub attempt: u32,
    /// Task input merged with upstream output.
    pub input: Data,
    pub timeout: Option<Duration>,
    /// Wait before starting the attempt (retry delay).
    pub delay: Duration,
    pub worker: Arc<dyn Worker>,
}

impl ScheduledTask {
    pub fn from_task_info(
        chain_id: ChainId,
        node: usize,
        info: &TaskInfo,
        upstream: &Data,
        default_timeout: Option<Duration>,
        delay: Duration,
    ) -> Self {
        let mut input = info.task.input().clone();
        input.extend(upstream.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            chain_id,
            name: info.task.name().to_string(),
            node,
            slot: info.slot,
            attempt: info.attempt,
            input,
            timeout: info.task.timeout().or(default_timeout),
            delay,
            worker: info.task.worker(),
        }
    }

    pub fn id(&self) -> TaskId {
        TaskId {
            name: self.name.clone(),
            node: self.node,
            slot: self.slot,
        }
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("chain_id", &self.chain_id)
            .field("name", &self.name)
            .field("node", &self.node)
            .field("slot", &self.slot)
            .field("attempt", &self.attempt)
            .field("input", &self.input)
            .field("timeout", &self.timeout)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
