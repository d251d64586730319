use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub aws: AwsConfig,
    pub offset_store: OffsetStoreConfig,
    /// Lookback used when a stream has no stored cursor.
    #[serde(with = "humantime_serde", default = "default_fallback_duration")]
    pub fallback_duration: Duration,
    #[serde(default)]
    pub tailer: TailerConfig,
    pub services: Vec<ServiceConfig>,
}

fn default_fallback_duration() -> Duration {
    Duration::from_secs(3600)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// Overrides `https://logs.{region}.amazonaws.com`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(with = "humantime_serde", default = "default_aws_timeout")]
    pub timeout: Duration,
}

fn default_aws_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Offset store backend, selected once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OffsetStoreConfig {
    Consul(ConsulStoreConfig),
    File(FileStoreConfig),
    Memory,
    Kafka(KafkaStoreConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulStoreConfig {
    #[serde(default = "default_consul_address")]
    pub address: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(with = "humantime_serde", default = "default_consul_timeout")]
    pub timeout: Duration,
}

fn default_consul_address() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_consul_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaStoreConfig {
    pub brokers: Vec<String>,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailerConfig {
    /// Maximum events requested per poll.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause after a poll that returned no events.
    #[serde(with = "humantime_serde", default = "default_idle_delay")]
    pub idle_delay: Duration,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub on_sink_error: SinkErrorPolicy,
    /// How long shutdown waits for tailers to finish an in-flight checkpoint.
    #[serde(with = "humantime_serde", default = "default_shutdown_grace")]
    pub shutdown_grace: Duration,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            idle_delay: default_idle_delay(),
            retry: RetryConfig::default(),
            on_sink_error: SinkErrorPolicy::default(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_idle_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(10)
}

/// Delay schedule after a failed poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(with = "humantime_serde", default = "default_retry_initial")]
    pub initial: Duration,
    #[serde(default = "default_retry_multiplier")]
    pub multiplier: f64,
    #[serde(with = "humantime_serde", default = "default_retry_max")]
    pub max: Duration,
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial: default_retry_initial(),
            multiplier: default_retry_multiplier(),
            max: default_retry_max(),
            jitter: false,
        }
    }
}

fn default_retry_initial() -> Duration {
    Duration::from_secs(15)
}

fn default_retry_multiplier() -> f64 {
    1.0
}

fn default_retry_max() -> Duration {
    Duration::from_secs(15)
}

/// What to do with the checkpoint when the sink rejects a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkErrorPolicy {
    /// Log the failure and save the advanced cursor anyway.
    #[default]
    Checkpoint,
    /// Log the failure and skip the save for that batch.
    Hold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Namespace for this service's checkpoint keys.
    pub consul_kv_path: String,
    pub log_configs: Vec<LogConfig>,
    #[serde(default)]
    pub destination: DestinationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub log_group_name: String,
    #[serde(default)]
    pub log_stream_prefix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DestinationConfig {
    #[default]
    Stdout,
    File(FileDestinationConfig),
    Http(HttpDestinationConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDestinationConfig {
    pub file_path: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpDestinationConfig {
    pub url: String,
    #[serde(with = "humantime_serde", default = "default_http_timeout")]
    pub timeout: Duration,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}
