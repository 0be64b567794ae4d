use crate::core::pipeline::Mode;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("--console-path is required for {0} mode")]
    MissingConsolePath(Mode),
    #[error("Path error: {0}")]
    PathError(String),
    #[error("Invalid glob pattern: {0}")]
    PatternError(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}
