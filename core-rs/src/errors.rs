//! Error types for the bundle harness core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Bundle not found: {0}")]
    BundleNotFound(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
