// src/store/record.rs

use chrono::{DateTime, Utc};

use crate::chain::TaskId;
use crate::engine::Outcome;

/// Outcome of one task attempt, as kept by the result store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub task: TaskId,
    pub attempt: u32,
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(task: TaskId, attempt: u32, outcome: Outcome) -> Self {
        Self {
            task,
            attempt,
            outcome,
            recorded_at: Utc::now(),
        }
    }
}
