pub mod batch;
pub mod file;
pub mod http;
pub mod stdout;

pub use batch::Batch;
pub use file::FileSink;
pub use http::HttpSink;
pub use stdout::StdoutSink;

use crate::config::types::DestinationConfig;
use crate::source::StreamId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("destination rejected batch with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid destination config: {0}")]
    InvalidConfig(String),

    #[error("sink is closed")]
    Closed,
}

/// Destination for tailed events.
///
/// A call either accepts the whole batch or fails the whole batch; events inside a batch
/// keep their order.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    async fn emit(&self, stream: &StreamId, batch: &Batch) -> Result<(), SinkError>;
}

/// Build the destination for one service.
pub fn build_sink(service: &str, config: &DestinationConfig) -> Result<Arc<dyn Sink>, SinkError> {
    let sink: Arc<dyn Sink> = match config {
        DestinationConfig::Stdout => Arc::new(StdoutSink::new(service)),
        DestinationConfig::File(file) => Arc::new(FileSink::new(service, file)),
        DestinationConfig::Http(http) => Arc::new(HttpSink::new(service, http)?),
    };
    Ok(sink)
}

/// Render a batch as `[stream] message` lines.
pub(crate) fn format_lines(stream: &StreamId, batch: &Batch) -> String {
    let mut out = String::new();
    for event in batch.events() {
        out.push('[');
        out.push_str(stream.as_str());
        out.push_str("] ");
        out.push_str(event.message.trim_end_matches('\n'));
        out.push('\n');
    }
    out
}
