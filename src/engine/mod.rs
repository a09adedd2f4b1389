// src/engine/mod.rs

//! Orchestration engine for a single enqueued chain.
//!
//! This module ties together:
//! - the per-chain scheduler (which node runs, which tasks to dispatch)
//! - the runtime event loop that reacts to:
//!   - the chain being started
//!   - task completion events
//!   - cancellation requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use thiserror::Error;

use crate::types::{Data, TaskName};

/// Result of one task attempt, as reported by a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Data),
    Failure(FailureReason),
    /// Ask the executor to run this task again.
    Retry,
}

impl Outcome {
    pub fn success(data: Data) -> Self {
        Outcome::Success(data)
    }

    /// Successful outcome that contributes no output keys.
    pub fn empty() -> Self {
        Outcome::Success(Data::new())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure(FailureReason::Reported(message.into()))
    }

    pub fn retry() -> Self {
        Outcome::Retry
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Failure(_) => "failure",
            Outcome::Retry => "retry",
        }
    }
}

/// Why a task attempt failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    /// The worker returned a failure.
    #[error("{0}")]
    Reported(String),

    /// The worker panicked; the panic was captured by the runner.
    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("retry limit exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },
}

/// Identity and reason of the task that failed a chain.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("task '{task}' in node {node} failed: {reason}")]
pub struct TaskFailure {
    pub task: TaskName,
    pub node: usize,
    pub reason: FailureReason,
}

/// Terminal result of a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// Merged output of the last node.
    Succeeded(Data),
    Failed(TaskFailure),
    Cancelled,
}

impl ChainOutcome {
    /// Convert into a `Result`, treating failure and cancellation as errors.
    pub fn into_result(self) -> crate::errors::Result<Data> {
        match self {
            ChainOutcome::Succeeded(data) => Ok(data),
            ChainOutcome::Failed(failure) => Err(failure.into()),
            ChainOutcome::Cancelled => Err(crate::errors::WorkchainError::Cancelled),
        }
    }
}

/// Observable status of a chain.
///
/// `Pending -> Running -> {Succeeded, Failed, Cancelled}`; `Cancelled` is also
/// reachable straight from `Pending`. Terminal states never change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainStatus {
    Pending,
    Running { node: usize },
    Succeeded(Data),
    Failed(TaskFailure),
    Cancelled,
}

impl ChainStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChainStatus::Succeeded(_) | ChainStatus::Failed(_) | ChainStatus::Cancelled
        )
    }

    /// The terminal outcome, if the chain has finished.
    pub fn outcome(&self) -> Option<ChainOutcome> {
        match self {
            ChainStatus::Succeeded(data) => Some(ChainOutcome::Succeeded(data.clone())),
            ChainStatus::Failed(failure) => Some(ChainOutcome::Failed(failure.clone())),
            ChainStatus::Cancelled => Some(ChainOutcome::Cancelled),
            ChainStatus::Pending | ChainStatus::Running { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChainStatus::Pending => "pending",
            ChainStatus::Running { .. } => "running",
            ChainStatus::Succeeded(_) => "succeeded",
            ChainStatus::Failed(_) => "failed",
            ChainStatus::Cancelled => "cancelled",
        }
    }
}

impl From<ChainOutcome> for ChainStatus {
    fn from(outcome: ChainOutcome) -> Self {
        match outcome {
            ChainOutcome::Succeeded(data) => ChainStatus::Succeeded(data),
            ChainOutcome::Failed(failure) => ChainStatus::Failed(failure),
            ChainOutcome::Cancelled => ChainStatus::Cancelled,
        }
    }
}

/// Events flowing into a chain's runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Begin executing the chain with the caller's initial input.
    Started { input: Data },
    /// One task attempt finished.
    TaskCompleted {
        task: TaskName,
        node: usize,
        slot: usize,
        attempt: u32,
        outcome: Outcome,
    },
    /// The caller asked for cancellation.
    CancelRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
