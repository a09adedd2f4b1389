// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::ExecutorConfig;
use crate::workers::PipelineSettings;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [executor]
/// retry_limit = 3
/// retry_delay_ms = 0
/// task_timeout_ms = 30000
/// max_concurrent_tasks = 4
///
/// [store]
/// ttl_secs = 600
///
/// [pipeline]
/// output_dir = "blur_outputs"
/// save_dir = "saved"
/// ```
///
/// All sections are optional and have reasonable defaults. This raw form has
/// not been validated; convert it with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    /// Re-runs permitted for a task that asks for a retry.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Delay before each re-run, in milliseconds.
    #[serde(default)]
    pub retry_delay_ms: u64,

    /// Default per-task timeout; unset means tasks may run forever.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,

    /// Executor-wide cap on concurrently running task attempts.
    #[serde(default)]
    pub max_concurrent_tasks: Option<usize>,
}

fn default_retry_limit() -> u32 {
    3
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            retry_delay_ms: 0,
            task_timeout_ms: None,
            max_concurrent_tasks: None,
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Seconds a finished chain stays queryable; unset keeps it until purged.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// `[pipeline]` section for the blur demo.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    /// Scratch directory for intermediate blur outputs.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where the final image is saved; defaults to `<output_dir>/saved`.
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("blur_outputs")
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            save_dir: None,
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub executor: ExecutorSection,
    pub store: StoreSection,
    pub pipeline: PipelineSection,
}

impl ConfigFile {
    /// Build without validation; used by `TryFrom<RawConfigFile>` once checks
    /// have passed.
    pub(crate) fn new_unchecked(
        executor: ExecutorSection,
        store: StoreSection,
        pipeline: PipelineSection,
    ) -> Self {
        Self {
            executor,
            store,
            pipeline,
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            retry_limit: self.executor.retry_limit,
            retry_delay: Duration::from_millis(self.executor.retry_delay_ms),
            task_timeout: self.executor.task_timeout_ms.map(Duration::from_millis),
            max_concurrent_tasks: self.executor.max_concurrent_tasks,
            result_ttl: self.store.ttl_secs.map(Duration::from_secs),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let output_dir = self.pipeline.output_dir.clone();
        let save_dir = self
            .pipeline
            .save_dir
            .clone()
            .unwrap_or_else(|| output_dir.join("saved"));
        PipelineSettings {
            output_dir,
            save_dir,
        }
    }
}
