#![allow(dead_code)]

use std::path::PathBuf;

use workchain::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// `build()` runs the same validation as loading from TOML.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.config.executor.retry_limit = limit;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.executor.retry_delay_ms = ms;
        self
    }

    pub fn with_task_timeout_ms(mut self, ms: u64) -> Self {
        self.config.executor.task_timeout_ms = Some(ms);
        self
    }

    pub fn with_max_concurrent_tasks(mut self, n: usize) -> Self {
        self.config.executor.max_concurrent_tasks = Some(n);
        self
    }

    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.config.store.ttl_secs = Some(secs);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.output_dir = dir.into();
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.save_dir = Some(dir.into());
        self
    }

    /// The raw, unvalidated config.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
