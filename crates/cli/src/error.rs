//! CLI error type.

use std::path::PathBuf;

use retail_sync::walker::SyncAborted;
use retail_sync::{ConfigError, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid status vocabulary in {}: {source}", .path.display())]
    Statuses {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Aborted(#[from] Box<SyncAborted>),

    #[error(transparent)]
    Sync(#[from] SyncError),
}
