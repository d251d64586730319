use super::{Batch, Sink, SinkError};
use crate::config::types::HttpDestinationConfig;
use crate::source::StreamId;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BatchPayload<'a> {
    stream: &'a StreamId,
    events: &'a Batch,
}

/// POSTs each batch as one JSON document.
#[derive(Debug)]
pub struct HttpSink {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(name: impl Into<String>, config: &HttpDestinationConfig) -> Result<Self, SinkError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SinkError::InvalidConfig(format!("header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SinkError::InvalidConfig(format!("header '{}' value: {}", key, e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            name: name.into(),
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&self, stream: &StreamId, batch: &Batch) -> Result<(), SinkError> {
        let payload = BatchPayload {
            stream,
            events: batch,
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(SinkError::Rejected {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
