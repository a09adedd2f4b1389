// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WorkchainError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WorkchainError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.executor, raw.store, raw.pipeline))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_executor(cfg)?;
    validate_store(cfg)?;
    validate_pipeline(cfg)?;
    Ok(())
}

fn validate_executor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executor.task_timeout_ms == Some(0) {
        return Err(WorkchainError::ConfigError(
            "[executor].task_timeout_ms must be >= 1 when set (got 0)".to_string(),
        ));
    }

    if cfg.executor.max_concurrent_tasks == Some(0) {
        return Err(WorkchainError::ConfigError(
            "[executor].max_concurrent_tasks must be >= 1 when set (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(cfg: &RawConfigFile) -> Result<()> {
    if cfg.store.ttl_secs == Some(0) {
        return Err(WorkchainError::ConfigError(
            "[store].ttl_secs must be >= 1 when set (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.output_dir.as_os_str().is_empty() {
        return Err(WorkchainError::ConfigError(
            "[pipeline].output_dir must not be empty".to_string(),
        ));
    }

    if let Some(save_dir) = &cfg.pipeline.save_dir {
        if save_dir == &cfg.pipeline.output_dir {
            // Cleanup would delete the saved images on the next run.
            return Err(WorkchainError::ConfigError(format!(
                "[pipeline].save_dir must differ from output_dir ({})",
                save_dir.display()
            )));
        }
    }

    Ok(())
}
