// src/chain/mod.rs

//! Chain representation and scheduling.
//!
//! - [`task`] defines tasks and the [`Worker`] contract.
//! - [`builder`] assembles a linear chain of task groups.
//! - [`scheduler`] contains the per-chain state machine that decides which
//!   tasks run next and derives the terminal outcome.
//! - [`task_info`] provides per-slot run state and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.

use std::sync::Arc;

pub mod builder;
pub mod scheduler;
pub mod scheduler_step;
pub mod task;
pub mod task_info;

pub use builder::{ChainBuilder, begin_with, begin_with_all};
pub use scheduler::{ChainScheduler, SchedulerOptions, next_attempt};
pub use scheduler_step::SchedulerStep;
pub use task::{BoxFuture, Task, Worker};
pub use task_info::{ScheduledTask, TaskId, TaskRunState};

/// A group of tasks that run concurrently once the previous node completed.
#[derive(Debug, Clone)]
pub struct ChainNode {
    tasks: Vec<Task>,
}

impl ChainNode {
    pub(crate) fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// An immutable, validated sequence of nodes. Produced by [`ChainBuilder::build`].
///
/// Cloning is cheap; nodes are shared.
#[derive(Debug, Clone)]
pub struct Chain {
    nodes: Arc<[ChainNode]>,
}

impl Chain {
    pub(crate) fn new(nodes: Vec<ChainNode>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    pub fn nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ChainNode> {
        self.nodes.get(index)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of tasks across all nodes.
    pub fn task_count(&self) -> usize {
        self.nodes.iter().map(ChainNode::len).sum()
    }
}
