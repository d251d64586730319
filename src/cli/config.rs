use super::{require_config_path, RunError};
use crate::config::load_config;
use crate::config::types::OffsetStoreConfig;
use std::path::PathBuf;

/// Load and validate the config document without contacting any backend.
pub fn check(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = require_config_path(config_path)?;
    let config = load_config(&config_path).map_err(RunError::from)?;

    let backend = match &config.offset_store {
        OffsetStoreConfig::Consul(_) => "consul",
        OffsetStoreConfig::File(_) => "file",
        OffsetStoreConfig::Memory => "memory",
        OffsetStoreConfig::Kafka(_) => "kafka (not supported at runtime)",
    };
    let log_configs: usize = config.services.iter().map(|s| s.log_configs.len()).sum();

    println!("Config OK: {}", config_path.display());
    println!("  region:       {}", config.aws.region);
    println!("  offset store: {}", backend);
    println!("  services:     {}", config.services.len());
    println!("  log configs:  {}", log_configs);
    Ok(())
}
