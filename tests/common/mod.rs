#![allow(dead_code)]

pub use workchain_test_utils::builders;
pub use workchain_test_utils::fake_executor;
pub use workchain_test_utils::fake_worker;
pub use workchain_test_utils::{init_tracing, run_chain, with_timeout};

use workchain::exec::{Executor, ExecutorConfig};

/// Executor with default settings except `retry_limit`.
pub fn executor_with_retry_limit(retry_limit: u32) -> Executor {
    Executor::new(ExecutorConfig {
        retry_limit,
        ..ExecutorConfig::default()
    })
}
