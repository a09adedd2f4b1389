// src/chain/task.rs

//! Tasks and the worker contract.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{FailureReason, Outcome};
use crate::types::{Data, TaskName, Value};

/// Boxed future returned by [`Worker::run`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The execution function behind a [`Task`].
///
/// Workers report every failure through [`Outcome::Failure`]. A panic is
/// still caught by the runner and reported as [`FailureReason::Panicked`].
pub trait Worker: Send + Sync + 'static {
    fn run(&self, input: Data) -> BoxFuture<'_, Outcome>;
}

/// Worker wrapping a synchronous closure that runs on the async worker thread.
struct FnWorker<F> {
    f: F,
}

impl<F> Worker for FnWorker<F>
where
    F: Fn(Data) -> Outcome + Send + Sync + 'static,
{
    fn run(&self, input: Data) -> BoxFuture<'_, Outcome> {
        let outcome = (self.f)(input);
        Box::pin(async move { outcome })
    }
}

type BlockingFn = dyn Fn(Data) -> Outcome + Send + Sync + 'static;

/// Worker whose closure may block on IO; it runs on Tokio's blocking pool.
struct BlockingWorker {
    f: Arc<BlockingFn>,
}

impl Worker for BlockingWorker {
    fn run(&self, input: Data) -> BoxFuture<'_, Outcome> {
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || f(input)).await {
                Ok(outcome) => outcome,
                Err(e) => Outcome::Failure(FailureReason::Panicked(e.to_string())),
            }
        })
    }
}

/// A named unit of work: a worker plus its declared data contract.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    input: Data,
    outputs: BTreeSet<String>,
    timeout: Option<Duration>,
    worker: Arc<dyn Worker>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, worker: impl Worker) -> Self {
        Self {
            name: name.into(),
            input: Data::new(),
            outputs: BTreeSet::new(),
            timeout: None,
            worker: Arc::new(worker),
        }
    }

    /// Build a task from a synchronous, non-blocking closure.
    pub fn from_fn<F>(name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn(Data) -> Outcome + Send + Sync + 'static,
    {
        Self::new(name, FnWorker { f })
    }

    /// Build a task from a closure that performs blocking IO.
    pub fn blocking<F>(name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn(Data) -> Outcome + Send + Sync + 'static,
    {
        Self::new(name, BlockingWorker { f: Arc::new(f) })
    }

    /// Add a key to the task's own input data.
    ///
    /// Upstream output with the same key takes precedence at run time.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }

    pub fn with_input_data(mut self, data: Data) -> Self {
        self.input.extend(data);
        self
    }

    /// Declare an output key. Only declared keys reach the next node.
    pub fn with_output(mut self, key: impl Into<String>) -> Self {
        self.outputs.insert(key.into());
        self
    }

    /// Per-task timeout, overriding the executor default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &Data {
        &self.input
    }

    pub fn outputs(&self) -> &BTreeSet<String> {
        &self.outputs
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn worker(&self) -> Arc<dyn Worker> {
        Arc::clone(&self.worker)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("outputs", &self.outputs)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
