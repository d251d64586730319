pub mod config;
pub mod discover;
pub mod run;

use crate::config::ConfigError;
use crate::source::SourceError;
use crate::storage::OffsetStoreError;
use crate::supervisor::SupervisorError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "config not found (searched $CWTAIL_CONFIG, ./config.yaml, ~/.config/cwtail/config.yaml, /etc/cwtail/config.yaml); use --config <path>"
    )]
    ConfigNotFound,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("log source error: {0}")]
    Source(#[from] SourceError),

    #[error("offset store error: {0}")]
    OffsetStore(#[from] OffsetStoreError),

    #[error("supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("all {0} tailer(s) stopped with errors")]
    AllTailersFailed(usize),
}

/// Resolve the config file location or fail with the list of searched places.
pub fn require_config_path(explicit: Option<PathBuf>) -> Result<PathBuf, RunError> {
    crate::config::resolve_config_path(explicit.as_deref()).ok_or(RunError::ConfigNotFound)
}
