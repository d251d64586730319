use super::checkpoint::{CheckpointKey, Cursor};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

/// Durable key -> cursor persistence.
///
/// Implementations must be safe to call concurrently for unrelated keys without
/// funnelling them through one lock.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Read the stored cursor, `None` when the key has never been written.
    async fn load_stored(&self, key: &CheckpointKey) -> Result<Option<Cursor>, OffsetStoreError>;

    /// Overwrite the cursor stored under `key`.
    async fn save(&self, key: &CheckpointKey, cursor: Cursor) -> Result<(), OffsetStoreError>;

    /// Load the cursor for `key`, falling back to `now - fallback` when absent.
    ///
    /// Absence is a normal first-run condition. Backend failures are returned to the caller.
    async fn load(
        &self,
        key: &CheckpointKey,
        fallback: Duration,
    ) -> Result<Cursor, OffsetStoreError> {
        match self.load_stored(key).await? {
            Some(cursor) => {
                tracing::info!(key = %key, cursor = %cursor, backend = self.backend(), "Loaded checkpoint");
                Ok(cursor)
            }
            None => {
                let cursor = Cursor::fallback(Utc::now(), fallback);
                tracing::info!(
                    key = %key,
                    cursor = %cursor,
                    fallback_secs = fallback.as_secs(),
                    backend = self.backend(),
                    "No checkpoint found, starting from fallback position"
                );
                Ok(cursor)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OffsetStoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("offset store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cursor stored under {key}: {value:?}")]
    Corrupt { key: String, value: String },

    #[error("invalid checkpoint key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("offset store rejected write for {key}")]
    Rejected { key: String },

    #[error("offset store backend '{backend}' is not supported: {reason}")]
    Unsupported { backend: &'static str, reason: String },

    #[error("invalid offset store config: {0}")]
    InvalidConfig(String),
}
