// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor backend
//! - recording outcomes and publishing status
//!
//! The core is intended to be unit tested without any Tokio, channels or
//! worker threads.

use crate::chain::ChainScheduler;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_cancel, handle_start, handle_task_completion,
};
use crate::types::ChainId;

/// Pure core runtime state for one chain.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: ChainScheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: ChainScheduler) -> Self {
        Self { scheduler }
    }

    pub fn chain_id(&self) -> ChainId {
        self.scheduler.chain_id()
    }

    pub fn scheduler(&self) -> &ChainScheduler {
        &self.scheduler
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Started { input } => handle_start(&mut self.scheduler, input),
            RuntimeEvent::TaskCompleted {
                node,
                slot,
                attempt,
                outcome,
                ..
            } => handle_task_completion(&mut self.scheduler, node, slot, attempt, outcome),
            RuntimeEvent::CancelRequested => handle_cancel(&mut self.scheduler),
        }
    }
}
