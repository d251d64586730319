use cwtail::config::types::{DestinationConfig, OffsetStoreConfig, SinkErrorPolicy};
use cwtail::config::{load_config, ConfigError};
use cwtail::source::source_specs;
use cwtail::storage::build_offset_store;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
aws:
  region: us-east-1
  endpoint: http://localhost:4566
  access_key: $env{CWTAIL_IT_ACCESS_KEY}
  secret_key: literal-secret
  timeout: 20s
offset_store:
  kind: consul
  address: http://consul.service:8500
  token: $env{CWTAIL_IT_CONSUL_TOKEN}
fallback_duration: 30m
tailer:
  page_size: 500
  idle_delay: 2s
  retry:
    initial: 1s
    multiplier: 2.0
    max: 1m
    jitter: true
  on_sink_error: hold
  shutdown_grace: 5s
services:
  - name: api
    consul_kv_path: cwtail/offsets/api/
    log_configs:
      - log_group_name: /ecs/api
        log_stream_prefix: web/
      - log_group_name: /ecs/api-migrations
    destination:
      type: file
      file_path: ~/cwtail-out
      file_name: api.log
  - name: billing
    consul_kv_path: cwtail/offsets/billing
    log_configs:
      - log_group_name: /ecs/billing
    destination:
      type: http
      url: https://ingest.example.com/logs
      headers:
        x-api-key: abc
"#;

#[test]
fn test_full_config_loads() {
    std::env::set_var("CWTAIL_IT_ACCESS_KEY", "AKIDEXAMPLE");
    std::env::set_var("CWTAIL_IT_CONSUL_TOKEN", "consul-token");

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, FULL_CONFIG).unwrap();

    let config = load_config(&config_path).expect("config should be valid");

    assert_eq!(config.aws.access_key.as_deref(), Some("AKIDEXAMPLE"));
    assert_eq!(config.aws.timeout, Duration::from_secs(20));
    assert_eq!(config.fallback_duration, Duration::from_secs(30 * 60));
    match &config.offset_store {
        OffsetStoreConfig::Consul(consul) => {
            assert_eq!(consul.address, "http://consul.service:8500");
            assert_eq!(consul.token.as_deref(), Some("consul-token"));
        }
        other => panic!("unexpected backend: {:?}", other),
    }
    assert_eq!(config.tailer.page_size, 500);
    assert_eq!(config.tailer.retry.max, Duration::from_secs(60));
    assert!(config.tailer.retry.jitter);
    assert_eq!(config.tailer.on_sink_error, SinkErrorPolicy::Hold);

    match &config.services[0].destination {
        DestinationConfig::File(file) => {
            assert!(!file.file_path.starts_with("~"));
            assert_eq!(file.file_name, "api.log");
        }
        other => panic!("unexpected destination: {:?}", other),
    }
    match &config.services[1].destination {
        DestinationConfig::Http(http) => {
            assert_eq!(http.headers.get("x-api-key").map(String::as_str), Some("abc"));
        }
        other => panic!("unexpected destination: {:?}", other),
    }

    let specs = source_specs(&config);
    assert_eq!(specs.len(), 3);
    assert_eq!(specs[1].log_group_name, "/ecs/api-migrations");
    assert_eq!(specs[1].log_stream_prefix, "");
    assert_eq!(specs[2].checkpoint_namespace, "cwtail/offsets/billing");

    std::env::remove_var("CWTAIL_IT_ACCESS_KEY");
    std::env::remove_var("CWTAIL_IT_CONSUL_TOKEN");
}

#[test]
fn test_missing_env_var_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
aws:
  region: us-east-1
  secret_key: $env{CWTAIL_IT_NEVER_SET}
offset_store:
  kind: memory
services:
  - name: api
    consul_kv_path: offsets/api
    log_configs:
      - log_group_name: /ecs/api
"#,
    )
    .unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("CWTAIL_IT_NEVER_SET"), "{}", err);
}

#[test]
fn test_validation_collects_every_problem() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
aws:
  region: ""
offset_store:
  kind: file
  dir: /var/lib/cwtail
tailer:
  page_size: 0
  retry:
    initial: 10s
    multiplier: 0.5
    max: 1s
services:
  - name: api
    consul_kv_path: ""
    log_configs: []
  - name: api
    consul_kv_path: offsets/api
    log_configs:
      - log_group_name: /ecs/api
"#,
    )
    .unwrap();

    match load_config(&config_path) {
        Err(ConfigError::ValidationList(errors)) => {
            let joined = errors.join("\n");
            assert!(joined.contains("aws.region"));
            assert!(joined.contains("page_size"));
            assert!(joined.contains("multiplier"));
            assert!(joined.contains("retry.max"));
            assert!(joined.contains("consul_kv_path"));
            assert!(joined.contains("at least one log_config"));
            assert!(joined.contains("duplicate service name"));
        }
        other => panic!("expected validation errors, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unknown_backend_kind_fails_to_parse() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
aws:
  region: us-east-1
offset_store:
  kind: redis
  address: localhost:6379
services:
  - name: api
    consul_kv_path: offsets/api
    log_configs:
      - log_group_name: /ecs/api
"#,
    )
    .unwrap();

    assert!(load_config(&config_path).is_err());
}

#[test]
fn test_kafka_backend_parses_but_refuses_to_build() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
aws:
  region: us-east-1
offset_store:
  kind: kafka
  brokers: ["kafka-1:9092"]
  topic: cwtail-offsets
services:
  - name: api
    consul_kv_path: offsets/api
    log_configs:
      - log_group_name: /ecs/api
"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    assert!(matches!(config.offset_store, OffsetStoreConfig::Kafka(_)));
    assert!(build_offset_store(&config.offset_store).is_err());
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_config(&temp_dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
