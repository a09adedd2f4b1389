// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running task attempts on the
//! Tokio runtime and reporting back to each chain's runtime via
//! `RuntimeEvent`s.
//!
//! - [`executor`] owns the public [`Executor`] and its configuration.
//! - [`handle`] provides the caller-facing [`ChainHandle`].
//! - [`task_runner`] handles a single task attempt (timeout, panics, delay).
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `TokioExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor;
pub mod handle;
pub mod task_runner;

pub use backend::{ExecutorBackend, TokioExecutorBackend};
pub use executor::{Executor, ExecutorConfig};
pub use handle::ChainHandle;
