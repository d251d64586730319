use super::{format_lines, Batch, Sink, SinkError};
use crate::source::StreamId;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Prints `[stream] message` lines to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink {
    name: String,
}

impl StdoutSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&self, stream: &StreamId, batch: &Batch) -> Result<(), SinkError> {
        let lines = format_lines(stream, batch);
        let mut stdout = tokio::io::stdout();
        stdout.write_all(lines.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}
