// src/store/mod.rs

//! In-memory result store.
//!
//! Tracks status and per-attempt execution records for every enqueued chain.
//! The outer map lock is only held to look up or insert an entry; writes to a
//! chain go through that chain's own mutex, so unrelated chains never contend
//! on recording.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::chain::TaskId;
use crate::engine::{ChainStatus, Outcome};
use crate::types::ChainId;

mod record;

pub use record::ExecutionRecord;

#[derive(Debug)]
struct ChainEntry {
    status: ChainStatus,
    records: Vec<ExecutionRecord>,
    /// When the chain reached a terminal status; drives TTL expiry.
    finished_at: Option<Instant>,
}

impl ChainEntry {
    fn new() -> Self {
        Self {
            status: ChainStatus::Pending,
            records: Vec::new(),
            finished_at: None,
        }
    }

    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match (ttl, self.finished_at) {
            (Some(ttl), Some(finished)) => now.duration_since(finished) >= ttl,
            _ => false,
        }
    }
}

/// Thread-safe store of chain statuses and execution records.
#[derive(Debug, Default)]
pub struct ResultStore {
    chains: RwLock<HashMap<ChainId, Arc<Mutex<ChainEntry>>>>,
    /// Entries older than this (after finishing) are dropped. `None` keeps
    /// them until [`ResultStore::purge`].
    ttl: Option<Duration>,
}

impl ResultStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Register a chain as `Pending`. Re-registering resets its entry.
    pub fn register(&self, chain_id: ChainId) {
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        chains.insert(chain_id, Arc::new(Mutex::new(ChainEntry::new())));
        debug!(chain_id = %chain_id, "chain registered in result store");
    }

    /// Append the outcome of one task attempt.
    pub fn record_outcome(&self, chain_id: ChainId, task: TaskId, attempt: u32, outcome: Outcome) {
        let Some(entry) = self.entry(chain_id) else {
            warn!(chain_id = %chain_id, task = %task, "recording outcome for unknown chain; ignoring");
            return;
        };

        let mut entry = entry.lock().unwrap_or_else(|e| e.into_inner());
        entry
            .records
            .push(ExecutionRecord::new(task, attempt, outcome));
    }

    /// Update a chain's status. Terminal statuses are never overwritten.
    pub fn set_status(&self, chain_id: ChainId, status: ChainStatus) {
        let Some(entry) = self.entry(chain_id) else {
            warn!(chain_id = %chain_id, "status update for unknown chain; ignoring");
            return;
        };

        let mut entry = entry.lock().unwrap_or_else(|e| e.into_inner());
        if entry.status.is_terminal() {
            debug!(
                chain_id = %chain_id,
                current = entry.status.label(),
                requested = status.label(),
                "chain already terminal; keeping stored status"
            );
            return;
        }

        if status.is_terminal() {
            entry.finished_at = Some(Instant::now());
        }
        entry.status = status;
    }

    /// Current status, or `None` if the chain is unknown, purged or expired.
    pub fn get_status(&self, chain_id: ChainId) -> Option<ChainStatus> {
        let entry = self.entry(chain_id)?;
        let entry = entry.lock().unwrap_or_else(|e| e.into_inner());
        if entry.is_expired(self.ttl, Instant::now()) {
            return None;
        }
        Some(entry.status.clone())
    }

    /// Execution records of a chain, in the order they were recorded.
    pub fn records(&self, chain_id: ChainId) -> Vec<ExecutionRecord> {
        let Some(entry) = self.entry(chain_id) else {
            return Vec::new();
        };
        let entry = entry.lock().unwrap_or_else(|e| e.into_inner());
        if entry.is_expired(self.ttl, Instant::now()) {
            return Vec::new();
        }
        entry.records.clone()
    }

    /// Remove a chain's entry. Returns `true` if it existed.
    pub fn purge(&self, chain_id: ChainId) -> bool {
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        let removed = chains.remove(&chain_id).is_some();
        debug!(chain_id = %chain_id, removed, "purged chain from result store");
        removed
    }

    /// Drop every finished entry older than the TTL. Returns how many were
    /// removed; always zero without a TTL.
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let now = Instant::now();
        let mut chains = self.chains.write().unwrap_or_else(|e| e.into_inner());
        let before = chains.len();
        chains.retain(|_, entry| {
            let entry = entry.lock().unwrap_or_else(|e| e.into_inner());
            !entry.is_expired(self.ttl, now)
        });
        let removed = before - chains.len();

        if removed > 0 {
            debug!(removed, "expired chains purged from result store");
        }
        removed
    }

    /// Number of tracked chains, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.chains.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, chain_id: ChainId) -> Option<Arc<Mutex<ChainEntry>>> {
        let chains = self.chains.read().unwrap_or_else(|e| e.into_inner());
        chains.get(&chain_id).cloned()
    }
}
