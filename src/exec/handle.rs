// src/exec/handle.rs

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::{ChainOutcome, ChainStatus};
use crate::errors::{Result, WorkchainError};
use crate::types::ChainId;

/// Caller-facing reference to an enqueued chain.
///
/// Handles are cheap to clone; every clone observes the same chain.
#[derive(Debug, Clone)]
pub struct ChainHandle {
    id: ChainId,
    cancel: CancellationToken,
    status_rx: watch::Receiver<ChainStatus>,
}

impl ChainHandle {
    pub(crate) fn new(
        id: ChainId,
        cancel: CancellationToken,
        status_rx: watch::Receiver<ChainStatus>,
    ) -> Self {
        Self {
            id,
            cancel,
            status_rx,
        }
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    /// Latest published status.
    pub fn status(&self) -> ChainStatus {
        self.status_rx.borrow().clone()
    }

    /// Request cooperative cancellation. Idempotent; a no-op once the chain
    /// is terminal.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(chain_id = %self.id, "cancellation requested by caller");
        }
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the chain is terminal and return its outcome.
    ///
    /// Calling this again after completion returns the same outcome.
    pub async fn await_result(&self) -> Result<ChainOutcome> {
        let mut rx = self.status_rx.clone();
        let waited = rx.wait_for(ChainStatus::is_terminal).await.map(|s| s.clone());

        let status = match waited {
            Ok(status) => status,
            // Sender gone: whatever was last published is all there will be.
            Err(_) => rx.borrow().clone(),
        };

        status
            .outcome()
            .ok_or(WorkchainError::ExecutorStopped(self.id))
    }
}
