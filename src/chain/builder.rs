// src/chain/builder.rs

use std::collections::HashMap;

use tracing::debug;

use crate::chain::{Chain, ChainNode, Task};
use crate::errors::{Result, WorkchainError};

/// Start a chain whose first node holds a single task.
pub fn begin_with(task: Task) -> ChainBuilder {
    ChainBuilder::default().push_node(vec![task])
}

/// Start a chain whose first node holds several parallel tasks.
pub fn begin_with_all(tasks: Vec<Task>) -> ChainBuilder {
    ChainBuilder::default().push_node(tasks)
}

/// Assembles a linear chain of task groups.
///
/// Appending never fails immediately: the first configuration problem is
/// remembered and returned from [`ChainBuilder::build`], so a malformed chain
/// can never be enqueued. `build` consumes the builder, which rules out
/// appending to a frozen chain.
#[derive(Debug, Default)]
pub struct ChainBuilder {
    nodes: Vec<ChainNode>,
    error: Option<String>,
}

impl ChainBuilder {
    /// Append a node containing a single task.
    pub fn then(self, task: Task) -> Self {
        self.push_node(vec![task])
    }

    /// Append a node whose tasks run in parallel.
    pub fn then_all(self, tasks: Vec<Task>) -> Self {
        self.push_node(tasks)
    }

    /// Freeze the chain.
    pub fn build(self) -> Result<Chain> {
        if let Some(message) = self.error {
            return Err(WorkchainError::ConfigError(message));
        }

        debug!(nodes = self.nodes.len(), "chain built");
        Ok(Chain::new(self.nodes))
    }

    fn push_node(mut self, tasks: Vec<Task>) -> Self {
        if self.error.is_some() {
            return self;
        }

        let index = self.nodes.len();
        if let Err(message) = validate_node(index, &tasks) {
            self.error = Some(message);
            return self;
        }

        self.nodes.push(ChainNode::new(tasks));
        self
    }
}

/// A node needs at least one task, and parallel tasks must not declare the
/// same output key.
fn validate_node(index: usize, tasks: &[Task]) -> std::result::Result<(), String> {
    if tasks.is_empty() {
        return Err(format!("node {index} must contain at least one task"));
    }

    let mut owners: HashMap<&str, &str> = HashMap::new();
    for task in tasks {
        for key in task.outputs() {
            if let Some(first) = owners.insert(key.as_str(), task.name()) {
                return Err(format!(
                    "output key '{}' is declared by both '{}' and '{}' in node {}",
                    key,
                    first,
                    task.name(),
                    index
                ));
            }
        }
    }

    Ok(())
}
