pub mod cloudwatch;
pub mod discover;
pub mod memory;
pub mod sigv4;
pub mod types;

pub use cloudwatch::CloudWatchClient;
pub use discover::{DiscoveryError, StreamDiscoverer};
pub use memory::InMemoryLogSource;
pub use types::{
    EventPage, EventsRequest, LogEvent, LogSource, LogSourceSpec, SourceError, StreamId, StreamPage,
};

use crate::config::types::Config;

/// Flatten the configured services into one logical source per log config.
pub fn source_specs(config: &Config) -> Vec<LogSourceSpec> {
    config
        .services
        .iter()
        .flat_map(|service| {
            service.log_configs.iter().map(move |log_config| LogSourceSpec {
                service: service.name.clone(),
                log_group_name: log_config.log_group_name.clone(),
                log_stream_prefix: log_config.log_stream_prefix.clone(),
                checkpoint_namespace: service.consul_kv_path.clone(),
            })
        })
        .collect()
}
