use super::backoff::Backoff;
use crate::config::types::{Config, RetryConfig, SinkErrorPolicy};
use crate::sink::{Batch, Sink};
use crate::source::{EventsRequest, LogSource, StreamId};
use crate::storage::{CheckpointKey, Cursor, OffsetStore, OffsetStoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

/// Consecutive failed polls after which a forward token is no longer trusted.
const TOKEN_RESET_AFTER_FAILURES: u32 = 3;

#[derive(Debug, Error)]
pub enum TailerError {
    #[error("failed to load checkpoint {key}: {source}")]
    Load {
        key: String,
        #[source]
        source: OffsetStoreError,
    },
}

/// Knobs shared by every tailer of a run.
#[derive(Debug, Clone)]
pub struct TailerSettings {
    pub page_size: u32,
    pub idle_delay: Duration,
    pub retry: RetryConfig,
    pub on_sink_error: SinkErrorPolicy,
    /// Lookback used when no cursor is stored.
    pub fallback: Duration,
}

impl TailerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.tailer.page_size,
            idle_delay: config.tailer.idle_delay,
            retry: config.tailer.retry.clone(),
            on_sink_error: config.tailer.on_sink_error,
            fallback: config.fallback_duration,
        }
    }
}

/// The one stream a tailer is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub service: String,
    pub log_group_name: String,
    pub stream: StreamId,
    pub key: CheckpointKey,
}

/// Counters reported when a tailer stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailerStats {
    pub polls: u64,
    pub poll_failures: u64,
    pub empty_polls: u64,
    pub batches: u64,
    pub events: u64,
    pub sink_failures: u64,
    pub saves: u64,
    pub save_failures: u64,
    pub held_checkpoints: u64,
    /// In-memory cursor at exit.
    pub cursor: Option<Cursor>,
    /// Last cursor the store acknowledged during this run.
    pub saved_cursor: Option<Cursor>,
}

enum State {
    Init,
    Poll,
    Emit(Batch),
    Checkpoint { delivered: bool },
}

/// Tails one stream: load cursor, then poll -> emit -> checkpoint until cancelled.
pub struct Tailer {
    target: StreamTarget,
    source: Arc<dyn LogSource>,
    sink: Arc<dyn Sink>,
    store: Arc<dyn OffsetStore>,
    settings: TailerSettings,
}

impl Tailer {
    pub fn new(
        target: StreamTarget,
        source: Arc<dyn LogSource>,
        sink: Arc<dyn Sink>,
        store: Arc<dyn OffsetStore>,
        settings: TailerSettings,
    ) -> Self {
        Self {
            target,
            source,
            sink,
            store,
            settings,
        }
    }

    pub fn target(&self) -> &StreamTarget {
        &self.target
    }

    /// Run until `cancel` fires or the starting cursor cannot be loaded.
    ///
    /// Cancellation is honoured before loading, before each poll and before each emit, and
    /// interrupts in-flight polls and sleeps. A checkpoint that follows an emitted batch always
    /// completes, so the caller bounds shutdown with its own grace period.
    pub async fn run(self, cancel: CancellationToken) -> Result<TailerStats, TailerError> {
        let span = info_span!(
            "tailer",
            service = %self.target.service,
            group = %self.target.log_group_name,
            stream = %self.target.stream,
            key = %self.target.key,
        );
        self.run_loop(cancel).instrument(span).await
    }

    async fn run_loop(self, cancel: CancellationToken) -> Result<TailerStats, TailerError> {
        let mut stats = TailerStats::default();
        let mut backoff = Backoff::new(&self.settings.retry);
        let mut cursor = Cursor::from_millis(0);
        let mut next_token: Option<String> = None;
        // Set once a batch was read past the loaded cursor; without a forward token the next
        // read must then start after the cursor instead of at it.
        let mut read_past_cursor = false;
        let mut state = State::Init;

        loop {
            state = match state {
                State::Init => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let loaded = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = self.store.load(&self.target.key, self.settings.fallback) => result,
                    };
                    cursor = loaded.map_err(|source| {
                        error!(error = %source, "Failed to load checkpoint, tailer will not start");
                        TailerError::Load {
                            key: self.target.key.to_string(),
                            source,
                        }
                    })?;
                    stats.cursor = Some(cursor);
                    info!(cursor = %cursor, "Tailer started");
                    State::Poll
                }

                State::Poll => {
                    if cancel.is_cancelled() {
                        break;
                    }

                    let start_time = if next_token.is_none() && read_past_cursor {
                        cursor.as_millis().saturating_add(1)
                    } else {
                        cursor.as_millis()
                    };
                    let request = EventsRequest {
                        log_group_name: self.target.log_group_name.clone(),
                        log_stream_name: self.target.stream.as_str().to_string(),
                        start_time: Some(start_time),
                        next_token: next_token.clone(),
                        limit: self.settings.page_size,
                    };

                    stats.polls += 1;
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = self.source.get_log_events(&request) => result,
                    };

                    match result {
                        Err(e) => {
                            stats.poll_failures += 1;
                            let delay = backoff.next_delay();
                            warn!(
                                error = %e,
                                attempt = backoff.attempts(),
                                retry_in_ms = delay.as_millis() as u64,
                                "Poll failed, retrying"
                            );
                            if next_token.is_some()
                                && (e.is_rejected_request()
                                    || backoff.attempts() >= TOKEN_RESET_AFTER_FAILURES)
                            {
                                // Forward tokens expire; resume from the cursor instead
                                warn!(cursor = %cursor, "Dropping forward token, next poll restarts from the cursor");
                                next_token = None;
                            }
                            if !sleep_or_cancel(delay, &cancel).await {
                                break;
                            }
                            State::Poll
                        }
                        Ok(page) => {
                            backoff.reset();
                            if page.next_forward_token.is_some() {
                                next_token = page.next_forward_token;
                            }

                            match Batch::new(page.events) {
                                None => {
                                    stats.empty_polls += 1;
                                    trace!("No new events");
                                    if !sleep_or_cancel(self.settings.idle_delay, &cancel).await {
                                        break;
                                    }
                                    State::Poll
                                }
                                Some(batch) => {
                                    cursor = cursor.advance_to(Cursor::from_millis(batch.max_timestamp()));
                                    read_past_cursor = true;
                                    stats.cursor = Some(cursor);
                                    debug!(events = batch.len(), cursor = %cursor, "Fetched batch");
                                    State::Emit(batch)
                                }
                            }
                        }
                    }
                }

                State::Emit(batch) => {
                    if cancel.is_cancelled() {
                        debug!(events = batch.len(), "Cancelled before emit, batch will be re-read on restart");
                        break;
                    }

                    match self.sink.emit(&self.target.stream, &batch).await {
                        Ok(()) => {
                            stats.batches += 1;
                            stats.events += batch.len() as u64;
                            State::Checkpoint { delivered: true }
                        }
                        Err(e) => {
                            stats.sink_failures += 1;
                            error!(
                                sink = self.sink.name(),
                                events = batch.len(),
                                error = %e,
                                "Sink failed to accept batch"
                            );
                            State::Checkpoint { delivered: false }
                        }
                    }
                }

                State::Checkpoint { delivered } => {
                    if !delivered && self.settings.on_sink_error == SinkErrorPolicy::Hold {
                        stats.held_checkpoints += 1;
                        warn!(cursor = %cursor, "Holding checkpoint after sink failure");
                    } else {
                        match self.store.save(&self.target.key, cursor).await {
                            Ok(()) => {
                                stats.saves += 1;
                                stats.saved_cursor = Some(cursor);
                                trace!(cursor = %cursor, "Checkpoint saved");
                            }
                            Err(e) => {
                                stats.save_failures += 1;
                                error!(cursor = %cursor, error = %e, "Failed to save checkpoint");
                            }
                        }
                    }
                    State::Poll
                }
            };
        }

        info!(
            cursor = ?stats.cursor.map(|c| c.as_millis()),
            events = stats.events,
            save_failures = stats.save_failures,
            "Tailer stopped"
        );
        Ok(stats)
    }
}

/// Sleep for `delay`; returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
