// src/exec/executor.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

use crate::chain::{Chain, ChainScheduler, SchedulerOptions};
use crate::engine::{ChainStatus, CoreRuntime, Runtime, RuntimeEvent};
use crate::exec::backend::TokioExecutorBackend;
use crate::exec::handle::ChainHandle;
use crate::store::ResultStore;
use crate::types::{ChainId, Data};

/// Configuration for the [`Executor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Re-runs permitted for a task that returns `Retry`.
    pub retry_limit: u32,
    pub retry_delay: Duration,
    /// Default per-task timeout; `None` means no timeout.
    pub task_timeout: Option<Duration>,
    /// Upper bound on concurrently running task attempts across all chains.
    pub max_concurrent_tasks: Option<usize>,
    /// How long finished chains stay in the result store.
    pub result_ttl: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            retry_delay: Duration::ZERO,
            task_timeout: None,
            max_concurrent_tasks: None,
            result_ttl: None,
        }
    }
}

impl ExecutorConfig {
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            retry_limit: self.retry_limit,
            retry_delay: self.retry_delay,
            task_timeout: self.task_timeout,
        }
    }
}

/// Runs chains.
///
/// There is no process-wide instance: callers construct an executor and keep
/// it for as long as they want to enqueue work. Every enqueued chain gets its
/// own runtime task; chains share the result store and the optional
/// concurrency limit.
#[derive(Debug)]
pub struct Executor {
    config: ExecutorConfig,
    store: Arc<ResultStore>,
    permits: Option<Arc<Semaphore>>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let store = Arc::new(ResultStore::new(config.result_ttl));
        let permits = config
            .max_concurrent_tasks
            .map(|n| Arc::new(Semaphore::new(n)));

        Self {
            config,
            store,
            permits,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Shared result store for status queries by chain id.
    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Enqueue a chain with the input for its first node.
    ///
    /// Must be called from within a Tokio runtime. The chain starts in the
    /// background; use the returned handle to observe, cancel or await it.
    pub fn enqueue(&self, chain: Chain, input: Data) -> ChainHandle {
        let chain_id = ChainId::new();
        self.store.purge_expired();
        self.store.register(chain_id);

        let (status_tx, status_rx) = watch::channel(ChainStatus::Pending);
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
        let cancel = CancellationToken::new();

        info!(
            chain_id = %chain_id,
            nodes = chain.len(),
            tasks = chain.task_count(),
            "chain enqueued"
        );

        let backend = TokioExecutorBackend::new(rt_tx, self.permits.clone(), cancel.clone());
        let scheduler = ChainScheduler::new(chain_id, chain, self.config.scheduler_options());
        let core = CoreRuntime::new(scheduler);
        let runtime = Runtime::new(
            core,
            rt_rx,
            backend,
            Arc::clone(&self.store),
            status_tx,
            cancel.clone(),
        );

        let span = info_span!("chain", chain_id = %chain_id);
        tokio::spawn(
            async move {
                if let Err(e) = runtime.run(input).await {
                    error!(error = %e, "chain runtime stopped with an error");
                }
            }
            .instrument(span),
        );

        ChainHandle::new(chain_id, cancel, status_rx)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}
