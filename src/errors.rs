// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::engine::TaskFailure;
use crate::types::ChainId;

#[derive(Error, Debug)]
pub enum WorkchainError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Chain failed: {0}")]
    TaskFailed(#[from] TaskFailure),

    #[error("Chain was cancelled")]
    Cancelled,

    #[error("Executor stopped before chain {0} reached a terminal state")]
    ExecutorStopped(ChainId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WorkchainError>;
