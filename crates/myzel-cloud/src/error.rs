//! Engine and provider error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the reconciliation engine and by resource implementations
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Resource type is not registered: {0}")]
    UnregisteredResource(String),

    #[error("Resource type registered twice: {0}")]
    DuplicateRegistration(String),

    #[error("Resource registry has already been installed")]
    RegistryAlreadyInitialized,

    #[error("Resource registry has not been installed")]
    RegistryNotInitialized,

    #[error("Invalid state file {}: {reason}", path.display())]
    InvalidState { path: PathBuf, reason: String },

    #[error("Resource declared twice in one deployment: {0}")]
    DuplicateResource(String),

    #[error("Deployment session is closed: {0}")]
    SessionClosed(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Provider failure passed through untouched
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
