#![allow(dead_code)]

use async_trait::async_trait;
use cwtail::config::types::{RetryConfig, SinkErrorPolicy};
use cwtail::sink::{Batch, Sink, SinkError};
use cwtail::source::{LogEvent, StreamId};
use cwtail::storage::{CheckpointKey, Cursor, MemoryOffsetStore, OffsetStore, OffsetStoreError};
use cwtail::tailer::{StreamTarget, TailerSettings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const GROUP: &str = "/ecs/api";

/// Sink that keeps every accepted batch, or fails every batch while `failing` is set.
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<(StreamId, Vec<LogEvent>)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub fn batches(&self) -> Vec<(StreamId, Vec<LogEvent>)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, events)| events.iter().map(|e| e.timestamp))
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.timestamps().len()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn emit(&self, stream: &StreamId, batch: &Batch) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected {
                status: 503,
                message: "destination down".to_string(),
            });
        }
        self.batches
            .lock()
            .unwrap()
            .push((stream.clone(), batch.events().to_vec()));
        Ok(())
    }
}

/// Memory store that records saves and can be told to fail loads or saves.
#[derive(Default)]
pub struct ScriptedStore {
    inner: MemoryOffsetStore,
    saves: Mutex<Vec<(CheckpointKey, Cursor)>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &CheckpointKey, cursor: i64) {
        self.inner.insert(key.clone(), Cursor::from_millis(cursor));
    }

    pub fn stored(&self, key: &CheckpointKey) -> Option<i64> {
        self.inner.get(key).map(|c| c.as_millis())
    }

    pub fn saves(&self) -> Vec<(CheckpointKey, Cursor)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OffsetStore for ScriptedStore {
    fn backend(&self) -> &'static str {
        "scripted"
    }

    async fn load_stored(&self, key: &CheckpointKey) -> Result<Option<Cursor>, OffsetStoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(OffsetStoreError::Status {
                status: 500,
                body: "store unavailable".to_string(),
            });
        }
        self.inner.load_stored(key).await
    }

    async fn save(&self, key: &CheckpointKey, cursor: Cursor) -> Result<(), OffsetStoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(OffsetStoreError::Status {
                status: 500,
                body: "store unavailable".to_string(),
            });
        }
        self.saves.lock().unwrap().push((key.clone(), cursor));
        self.inner.save(key, cursor).await
    }
}

pub fn settings() -> TailerSettings {
    TailerSettings {
        page_size: 100,
        idle_delay: Duration::from_millis(10),
        retry: RetryConfig {
            initial: Duration::from_millis(10),
            multiplier: 1.0,
            max: Duration::from_millis(10),
            jitter: false,
        },
        on_sink_error: SinkErrorPolicy::Checkpoint,
        fallback: Duration::from_secs(3600),
    }
}

pub fn target(stream: &str) -> StreamTarget {
    let stream = StreamId::from(stream);
    StreamTarget {
        service: "api".to_string(),
        log_group_name: GROUP.to_string(),
        key: CheckpointKey::new("cwtail/offsets/api", &stream),
        stream,
    }
}

/// Poll `condition` until it holds, panicking after a few seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached in time");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
