use super::checkpoint::{CheckpointKey, Cursor};
use super::traits::{OffsetStore, OffsetStoreError};
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-local offset store. Cursors do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryOffsetStore {
    cursors: DashMap<CheckpointKey, Cursor>,
}

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cursor, as if a previous run had saved it.
    pub fn insert(&self, key: CheckpointKey, cursor: Cursor) {
        self.cursors.insert(key, cursor);
    }

    pub fn get(&self, key: &CheckpointKey) -> Option<Cursor> {
        self.cursors.get(key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[async_trait]
impl OffsetStore for MemoryOffsetStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load_stored(&self, key: &CheckpointKey) -> Result<Option<Cursor>, OffsetStoreError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &CheckpointKey, cursor: Cursor) -> Result<(), OffsetStoreError> {
        self.cursors.insert(key.clone(), cursor);
        Ok(())
    }
}
