pub mod checkpoint;
pub mod consul;
pub mod file;
pub mod memory;
pub mod traits;

pub use checkpoint::{CheckpointKey, Cursor, CursorParseError};
pub use consul::ConsulOffsetStore;
pub use file::FileOffsetStore;
pub use memory::MemoryOffsetStore;
pub use traits::{OffsetStore, OffsetStoreError};

use crate::config::types::OffsetStoreConfig;
use std::sync::Arc;

/// Build the offset store selected by configuration.
///
/// Backends that cannot serve both load and save are refused here, before any tailer starts.
pub fn build_offset_store(config: &OffsetStoreConfig) -> Result<Arc<dyn OffsetStore>, OffsetStoreError> {
    match config {
        OffsetStoreConfig::Consul(consul) => {
            tracing::info!(address = %consul.address, "Using consul offset store");
            Ok(Arc::new(ConsulOffsetStore::new(consul)?))
        }
        OffsetStoreConfig::File(file) => {
            tracing::info!(dir = %file.dir.display(), "Using file offset store");
            Ok(Arc::new(FileOffsetStore::new(file.dir.clone())))
        }
        OffsetStoreConfig::Memory => {
            tracing::warn!("Using in-memory offset store, cursors will not survive a restart");
            Ok(Arc::new(MemoryOffsetStore::new()))
        }
        OffsetStoreConfig::Kafka(kafka) => Err(OffsetStoreError::Unsupported {
            backend: "kafka",
            reason: format!(
                "reading the latest cursor from topic '{}' needs a compacted-read index, which is not implemented",
                kafka.topic
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{FileStoreConfig, KafkaStoreConfig};

    #[test]
    fn test_kafka_backend_refused_at_construction() {
        let config = OffsetStoreConfig::Kafka(KafkaStoreConfig {
            brokers: vec!["localhost:9092".to_string()],
            topic: "cwtail-offsets".to_string(),
        });
        match build_offset_store(&config) {
            Err(OffsetStoreError::Unsupported { backend, .. }) => assert_eq!(backend, "kafka"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("kafka backend must not construct"),
        }
    }

    #[test]
    fn test_build_file_and_memory_backends() {
        let file = build_offset_store(&OffsetStoreConfig::File(FileStoreConfig {
            dir: "/tmp/cwtail-offsets".into(),
        }))
        .unwrap();
        assert_eq!(file.backend(), "file");

        let memory = build_offset_store(&OffsetStoreConfig::Memory).unwrap();
        assert_eq!(memory.backend(), "memory");
    }
}
