use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

const MAX_PAGE_SIZE: u32 = 10_000;

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate a config document held in memory.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded = unexpanded_env_vars(yaml_string);
    if unexpanded.is_empty() {
        return Ok(());
    }

    let error_msg = if unexpanded.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with a literal value",
            unexpanded[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with literal values",
            unexpanded.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

/// Expands tilde (~) in all PathBuf fields in the config.
fn expand_paths(config: &mut Config) {
    if let OffsetStoreConfig::File(file) = &mut config.offset_store {
        file.dir = expand_tilde(&file.dir);
    }

    for service in &mut config.services {
        if let DestinationConfig::File(file) = &mut service.destination {
            file.file_path = expand_tilde(&file.file_path);
        }
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.aws.region.trim().is_empty() {
        errors.push("aws.region must not be empty".to_string());
    }

    match &config.offset_store {
        OffsetStoreConfig::Consul(consul) if consul.address.trim().is_empty() => {
            errors.push("offset_store.address must not be empty".to_string());
        }
        OffsetStoreConfig::File(file) if file.dir.as_os_str().is_empty() => {
            errors.push("offset_store.dir must not be empty".to_string());
        }
        _ => {}
    }

    validate_tailer(&config.tailer, &mut errors);

    if config.services.is_empty() {
        errors.push("at least one service must be configured".to_string());
    }

    let mut seen_names = HashSet::new();
    for (idx, service) in config.services.iter().enumerate() {
        let label = if service.name.is_empty() {
            format!("services[{}]", idx)
        } else {
            format!("service '{}'", service.name)
        };

        if service.name.trim().is_empty() {
            errors.push(format!("{}: name must not be empty", label));
        } else if !seen_names.insert(service.name.as_str()) {
            errors.push(format!("{}: duplicate service name", label));
        }

        if service.consul_kv_path.trim_matches('/').is_empty() {
            errors.push(format!("{}: consul_kv_path must not be empty", label));
        }

        if service.log_configs.is_empty() {
            errors.push(format!("{}: at least one log_config is required", label));
        }
        for (log_idx, log_config) in service.log_configs.iter().enumerate() {
            if log_config.log_group_name.trim().is_empty() {
                errors.push(format!(
                    "{}: log_configs[{}].log_group_name must not be empty",
                    label, log_idx
                ));
            }
        }

        match &service.destination {
            DestinationConfig::File(file) => {
                if file.file_name.trim().is_empty() {
                    errors.push(format!("{}: destination.file_name must not be empty", label));
                }
                if file.file_name.contains('/') {
                    errors.push(format!(
                        "{}: destination.file_name must not contain '/', use file_path for directories",
                        label
                    ));
                }
            }
            DestinationConfig::Http(http) => {
                if reqwest::Url::parse(&http.url).is_err() {
                    errors.push(format!("{}: destination.url '{}' is not a valid URL", label, http.url));
                }
            }
            DestinationConfig::Stdout => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_tailer(tailer: &TailerConfig, errors: &mut Vec<String>) {
    if tailer.page_size == 0 || tailer.page_size > MAX_PAGE_SIZE {
        errors.push(format!(
            "tailer.page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, tailer.page_size
        ));
    }
    if tailer.idle_delay.is_zero() {
        errors.push("tailer.idle_delay must be greater than zero".to_string());
    }
    if tailer.retry.initial.is_zero() {
        errors.push("tailer.retry.initial must be greater than zero".to_string());
    }
    if !tailer.retry.multiplier.is_finite() || tailer.retry.multiplier < 1.0 {
        errors.push(format!(
            "tailer.retry.multiplier must be a finite number >= 1.0, got {}",
            tailer.retry.multiplier
        ));
    }
    if tailer.retry.max < tailer.retry.initial {
        errors.push("tailer.retry.max must be >= tailer.retry.initial".to_string());
    }
}
