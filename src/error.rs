// error.rs - Error type shared by the lifecycle, marshalling and namespace layers

use pyo3::PyErr;
use std::path::PathBuf;

/// Errors that can occur when driving the embedded interpreter
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Python error: {0}")]
    Python(String),
    #[error("Failed to load Python library {}: {reason}", path.display())]
    LibraryLoad { path: PathBuf, reason: String },
    #[error("Python runtime is already initialized")]
    AlreadyInitialized,
    #[error("Python runtime was finalized and cannot be used again")]
    Finalized,
    #[error("Group '{group}' is bound to a non-dict value of type {found}")]
    GroupConflict { group: String, found: String },
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PyErr> for BridgeError {
    fn from(err: PyErr) -> Self {
        BridgeError::Python(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
