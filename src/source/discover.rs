use super::types::{LogSource, LogSourceSpec, SourceError, StreamId};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to list streams in {log_group_name} (page {page}): {source}")]
    Source {
        log_group_name: String,
        page: usize,
        #[source]
        source: SourceError,
    },
}

/// Resolves a logical source into the concrete streams to tail.
pub struct StreamDiscoverer {
    source: Arc<dyn LogSource>,
}

impl StreamDiscoverer {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self { source }
    }

    /// List every stream in the group whose name starts with the configured prefix.
    ///
    /// Follows pagination until the source stops returning a token. The prefix is checked
    /// again locally even though the remote side already filters on it.
    pub async fn discover(&self, spec: &LogSourceSpec) -> Result<Vec<StreamId>, DiscoveryError> {
        let mut streams = Vec::new();
        let mut seen = HashSet::new();
        let mut seen_tokens = HashSet::new();
        let mut next_token: Option<String> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let response = self
                .source
                .describe_log_streams(&spec.log_group_name, &spec.log_stream_prefix, next_token.take())
                .await
                .map_err(|source| DiscoveryError::Source {
                    log_group_name: spec.log_group_name.clone(),
                    page,
                    source,
                })?;

            for stream in response.streams {
                if !stream.as_str().starts_with(&spec.log_stream_prefix) {
                    tracing::warn!(
                        log_group = %spec.log_group_name,
                        prefix = %spec.log_stream_prefix,
                        stream = %stream,
                        "Source returned a stream outside the requested prefix, skipping"
                    );
                    continue;
                }
                if seen.insert(stream.clone()) {
                    streams.push(stream);
                }
            }

            match response.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    tracing::warn!(
                        log_group = %spec.log_group_name,
                        page,
                        "Source repeated a pagination token, stopping discovery"
                    );
                    break;
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        tracing::info!(
            service = %spec.service,
            log_group = %spec.log_group_name,
            prefix = %spec.log_stream_prefix,
            streams = streams.len(),
            pages = page,
            "Discovered log streams"
        );

        Ok(streams)
    }
}
