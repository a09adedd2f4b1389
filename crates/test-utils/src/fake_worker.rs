#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use workchain::chain::{BoxFuture, Task, Worker};
use workchain::engine::Outcome;
use workchain::types::{Data, Value};

/// Shared record of the inputs a worker was called with.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Data>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, input: Data) {
        self.calls.lock().unwrap().push(input);
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn inputs(&self) -> Vec<Data> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Data> {
        self.calls.lock().unwrap().last().cloned()
    }
}

/// Worker that replays a script of outcomes, then repeats `fallback`.
pub struct ScriptedWorker {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    log: CallLog,
}

impl ScriptedWorker {
    pub fn new(log: CallLog, fallback: Outcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            log,
        }
    }

    /// Queue an outcome to return before falling back.
    pub fn then(self, outcome: Outcome) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }
}

impl Worker for ScriptedWorker {
    fn run(&self, input: Data) -> BoxFuture<'_, Outcome> {
        self.log.record(input);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { outcome })
    }
}

/// Lets a test hold gated workers mid-run and release them on demand.
#[derive(Clone)]
pub struct Gate {
    release: Arc<Semaphore>,
    started: Arc<watch::Sender<usize>>,
}

impl Gate {
    pub fn new() -> Self {
        let (started, _) = watch::channel(0);
        Self {
            release: Arc::new(Semaphore::new(0)),
            started: Arc::new(started),
        }
    }

    /// Wait until at least `n` gated workers have started.
    pub async fn wait_started(&self, n: usize) {
        let mut rx = self.started.subscribe();
        rx.wait_for(|count| *count >= n)
            .await
            .expect("gate sender dropped");
    }

    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    /// Let `n` waiting (or future) gated workers finish.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker that signals its start, blocks on a [`Gate`], then returns `outcome`.
pub struct GatedWorker {
    gate: Gate,
    log: CallLog,
    outcome: Outcome,
}

impl Worker for GatedWorker {
    fn run(&self, input: Data) -> BoxFuture<'_, Outcome> {
        Box::pin(async move {
            self.log.record(input);
            self.gate.started.send_modify(|count| *count += 1);
            if let Ok(permit) = self.gate.release.acquire().await {
                permit.forget();
            }
            self.outcome.clone()
        })
    }
}

/// Build a `Data` map from string pairs.
pub fn data(pairs: &[(&str, &str)]) -> Data {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

/// Task that records its input and succeeds with `outputs`, declaring every
/// output key.
pub fn succeed_with(name: &str, log: &CallLog, outputs: &[(&str, &str)]) -> Task {
    let output = data(outputs);
    let mut task = Task::new(name, ScriptedWorker::new(log.clone(), Outcome::success(output.clone())));
    for key in output.keys() {
        task = task.with_output(key.clone());
    }
    task
}

/// Task that records its input and succeeds with no output.
pub fn recording(name: &str, log: &CallLog) -> Task {
    Task::new(name, ScriptedWorker::new(log.clone(), Outcome::empty()))
}

/// Task that records its input and always fails with `message`.
pub fn fail(name: &str, log: &CallLog, message: &str) -> Task {
    Task::new(name, ScriptedWorker::new(log.clone(), Outcome::failure(message)))
}

/// Task that records its input and always asks for a retry.
pub fn always_retry(name: &str, log: &CallLog) -> Task {
    Task::new(name, ScriptedWorker::new(log.clone(), Outcome::retry()))
}

/// Task that asks for `retries` retries, then succeeds with no output.
pub fn retry_then_succeed(name: &str, log: &CallLog, retries: usize) -> Task {
    let mut worker = ScriptedWorker::new(log.clone(), Outcome::empty());
    for _ in 0..retries {
        worker = worker.then(Outcome::retry());
    }
    Task::new(name, worker)
}

/// Task that blocks on `gate`, then returns `outcome`.
pub fn gated(name: &str, gate: &Gate, log: &CallLog, outcome: Outcome) -> Task {
    Task::new(
        name,
        GatedWorker {
            gate: gate.clone(),
            log: log.clone(),
            outcome,
        },
    )
}

/// Task that sleeps for `duration` before succeeding.
pub fn sleeping(name: &str, duration: Duration) -> Task {
    struct Sleeper(Duration);

    impl Worker for Sleeper {
        fn run(&self, _input: Data) -> BoxFuture<'_, Outcome> {
            let duration = self.0;
            Box::pin(async move {
                tokio::time::sleep(duration).await;
                Outcome::empty()
            })
        }
    }

    Task::new(name, Sleeper(duration))
}

/// Task whose worker panics with `message`.
pub fn panicking(name: &str, message: &'static str) -> Task {
    Task::from_fn(name, move |_input| panic!("{}", message))
}
