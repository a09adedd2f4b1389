//! Shared helpers for `workchain` integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fake_worker;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};
use workchain::chain::Chain;
use workchain::engine::ChainOutcome;
use workchain::exec::{ChainHandle, Executor};
use workchain::types::Data;

static INIT: Once = Once::new();

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `-- --nocapture`). Filter with `WORKCHAIN_LOG`, e.g.
/// `WORKCHAIN_LOG=workchain::chain=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var(workchain::logging::LOG_ENV)
            .ok()
            .and_then(|s| EnvFilter::try_new(s).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .expect("test step timed out")
}

/// Enqueue `chain` and wait for its outcome.
pub async fn run_chain(executor: &Executor, chain: Chain, input: Data) -> (ChainHandle, ChainOutcome) {
    let handle = executor.enqueue(chain, input);
    let outcome = with_timeout(handle.await_result())
        .await
        .expect("executor stopped before the chain finished");
    (handle, outcome)
}
