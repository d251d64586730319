use super::{format_lines, Batch, Sink, SinkError};
use crate::config::types::FileDestinationConfig;
use crate::source::StreamId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends `[stream] message` lines to a single file.
///
/// All tailers of a service share one handle; each batch is written with a single
/// `write_all` under the lock so lines from different streams never interleave mid-batch.
#[derive(Debug)]
pub struct FileSink {
    name: String,
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: &FileDestinationConfig) -> Self {
        Self {
            name: name.into(),
            path: config.file_path.join(&config.file_name),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<File, SinkError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        tracing::info!(sink = %self.name, path = %self.path.display(), "Opened file sink");
        Ok(file)
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&self, stream: &StreamId, batch: &Batch) -> Result<(), SinkError> {
        let lines = format_lines(stream, batch);
        let mut guard = self.file.lock().await;

        if guard.is_none() {
            *guard = Some(self.open().await?);
        }

        let result = match guard.as_mut() {
            Some(file) => match file.write_all(lines.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            },
            None => return Err(SinkError::Closed),
        };

        if let Err(e) = result {
            // Drop the handle so the next batch reopens the file
            *guard = None;
            return Err(e.into());
        }

        Ok(())
    }
}
