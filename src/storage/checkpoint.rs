use crate::source::StreamId;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("invalid cursor value {value:?}: expected base-10 milliseconds since epoch")]
pub struct CursorParseError {
    pub value: String,
}

/// Position within one stream: the millisecond timestamp of the last processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(i64);

impl Cursor {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Starting point used when no checkpoint exists: `now - lookback`.
    pub fn fallback(now: DateTime<Utc>, lookback: Duration) -> Self {
        let lookback_ms = i64::try_from(lookback.as_millis()).unwrap_or(i64::MAX);
        Self(now.timestamp_millis().saturating_sub(lookback_ms))
    }

    /// Persisted representation: base-10 ASCII integer.
    pub fn encode(&self) -> String {
        self.0.to_string()
    }

    pub fn decode(value: &str) -> Result<Self, CursorParseError> {
        value
            .trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| CursorParseError {
                value: value.to_string(),
            })
    }

    /// Returns the later of the two positions.
    pub fn advance_to(self, candidate: Cursor) -> Self {
        self.max(candidate)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of a stream's cursor in the offset store: `{namespace}/{stream_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointKey(String);

impl CheckpointKey {
    pub fn new(namespace: &str, stream: &StreamId) -> Self {
        let namespace = namespace.trim_end_matches('/');
        if namespace.is_empty() {
            Self(stream.as_str().to_string())
        } else {
            Self(format!("{}/{}", namespace, stream))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path-like segments of the key. Empty segments are preserved so backends can reject them.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckpointKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
