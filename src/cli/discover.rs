use super::{require_config_path, RunError};
use crate::config::load_config;
use crate::source::{source_specs, CloudWatchClient, StreamDiscoverer};
use crate::storage::{build_offset_store, CheckpointKey};
use std::path::PathBuf;
use std::sync::Arc;

/// Print the streams each configured source resolves to, with their checkpoint keys.
///
/// With `show_cursors`, the stored cursor for every key is read from the offset store as well.
pub async fn discover(
    config_path: Option<PathBuf>,
    show_cursors: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = require_config_path(config_path)?;
    let config = load_config(&config_path).map_err(RunError::from)?;

    let source = Arc::new(CloudWatchClient::new(&config.aws).map_err(RunError::from)?);
    let store = if show_cursors {
        Some(build_offset_store(&config.offset_store).map_err(RunError::from)?)
    } else {
        None
    };
    let discoverer = StreamDiscoverer::new(source);

    let mut failures = 0usize;
    for spec in source_specs(&config) {
        println!(
            "{} {} (prefix '{}')",
            spec.service, spec.log_group_name, spec.log_stream_prefix
        );

        let streams = match discoverer.discover(&spec).await {
            Ok(streams) => streams,
            Err(e) => {
                failures += 1;
                println!("  error: {}", e);
                continue;
            }
        };

        if streams.is_empty() {
            println!("  (no matching streams)");
        }

        for stream in streams {
            let key = CheckpointKey::new(&spec.checkpoint_namespace, &stream);
            match &store {
                Some(store) => {
                    let cursor = match store.load_stored(&key).await {
                        Ok(Some(cursor)) => cursor.to_string(),
                        Ok(None) => "-".to_string(),
                        Err(e) => format!("error: {}", e),
                    };
                    println!("  {}  {}  {}", stream, key, cursor);
                }
                None => println!("  {}  {}", stream, key),
            }
        }
    }

    if failures > 0 {
        return Err(format!("discovery failed for {} source(s)", failures).into());
    }
    Ok(())
}
