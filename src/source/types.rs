use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of one concrete, independently ordered stream within a log group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StreamId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A logical source: one log group plus the stream-name prefix to tail inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSourceSpec {
    pub service: String,
    pub log_group_name: String,
    pub log_stream_prefix: String,
    /// Namespace that checkpoint keys for this source live under.
    pub checkpoint_namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_time: Option<i64>,
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            ingestion_time: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamPage {
    pub streams: Vec<StreamId>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<LogEvent>,
    /// Token that continues reading after the last returned event.
    pub next_forward_token: Option<String>,
}

/// One read of a stream, always oldest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
    /// Inclusive lower bound in epoch milliseconds.
    pub start_time: Option<i64>,
    pub next_token: Option<String>,
    pub limit: u32,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("log source returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("missing credentials: {0}")]
    Credentials(String),

    #[error("invalid log source config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Unavailable(String),
}

impl SourceError {
    /// The source refused the request itself (4xx), as opposed to failing to serve it.
    pub fn is_rejected_request(&self) -> bool {
        matches!(self, SourceError::Api { status, .. } if (400..500).contains(status))
    }
}

/// Remote append-only log source.
///
/// Both calls are read-only, so retrying them with the same arguments is always safe.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn describe_log_streams(
        &self,
        log_group_name: &str,
        prefix: &str,
        next_token: Option<String>,
    ) -> Result<StreamPage, SourceError>;

    async fn get_log_events(&self, request: &EventsRequest) -> Result<EventPage, SourceError>;
}
