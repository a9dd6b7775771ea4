//! Error types for the dashboard backend

use thiserror::Error;

/// Main error type for the dashboard backend
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("A deployment is already in progress")]
    DeploymentInProgress,

    #[error("Deployment not found")]
    DeploymentNotFound,

    #[error("Deployment is not running")]
    DeploymentNotRunning,

    #[error("Process stdin is not available")]
    StdinUnavailable,

    #[error("Spawn error: {0}")]
    SpawnError(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DashboardError {
    fn from(err: anyhow::Error) -> Self {
        DashboardError::Internal(err.to_string())
    }
}
