use super::{require_config_path, RunError};
use crate::config::load_config;
use crate::source::CloudWatchClient;
use crate::storage::build_offset_store;
use crate::supervisor::Supervisor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = require_config_path(config_path)?;
    run_tailers(&config_path).await.map_err(|e| e.into())
}

async fn run_tailers(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let source = Arc::new(CloudWatchClient::new(&config.aws)?);
    info!(endpoint = %source.endpoint(), region = %config.aws.region, "CloudWatch Logs client ready");

    let store = build_offset_store(&config.offset_store)?;

    let handle = Supervisor::new(config, source, store).start().await?;
    info!(tailers = handle.tailer_count(), "Tailing started, press Ctrl+C to shutdown");

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        cancel.cancel();
    });

    let report = handle.join().await;

    for (target, stats) in &report.completed {
        info!(
            stream = %target.stream,
            events = stats.events,
            cursor = ?stats.cursor.map(|c| c.as_millis()),
            saved_cursor = ?stats.saved_cursor.map(|c| c.as_millis()),
            "Tailer finished"
        );
    }
    for (target, reason) in &report.failed {
        error!(stream = %target.stream, key = %target.key, error = %reason, "Tailer failed");
    }
    if report.aborted > 0 {
        warn!(aborted = report.aborted, "Some tailers did not stop within the grace period");
    }

    if report.completed.is_empty() && !report.failed.is_empty() {
        return Err(RunError::AllTailersFailed(report.failed.len()));
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
