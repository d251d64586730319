use super::checkpoint::{CheckpointKey, Cursor};
use super::traits::{OffsetStore, OffsetStoreError};
use crate::config::types::ConsulStoreConfig;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Offset store backed by the Consul KV HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulOffsetStore {
    kv_base: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl ConsulOffsetStore {
    pub fn new(config: &ConsulStoreConfig) -> Result<Self, OffsetStoreError> {
        let address = if config.address.ends_with('/') {
            config.address.clone()
        } else {
            format!("{}/", config.address)
        };
        let kv_base = Url::parse(&address)
            .and_then(|base| base.join("v1/kv/"))
            .map_err(|e| {
                OffsetStoreError::InvalidConfig(format!(
                    "invalid consul address '{}': {}",
                    config.address, e
                ))
            })?;

        if kv_base.cannot_be_a_base() {
            return Err(OffsetStoreError::InvalidConfig(format!(
                "consul address '{}' must be an http(s) URL",
                config.address
            )));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            kv_base,
            token: config.token.clone().filter(|t| !t.is_empty()),
            client,
        })
    }

    /// URL for a key; each key segment is percent-encoded on its own so `/` stays a separator.
    fn key_url(&self, key: &CheckpointKey) -> Url {
        let mut url = self.kv_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(key.segments());
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }
}

#[async_trait]
impl OffsetStore for ConsulOffsetStore {
    fn backend(&self) -> &'static str {
        "consul"
    }

    async fn load_stored(&self, key: &CheckpointKey) -> Result<Option<Cursor>, OffsetStoreError> {
        let mut url = self.key_url(key);
        url.set_query(Some("raw"));

        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(OffsetStoreError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        Cursor::decode(&body)
            .map(Some)
            .map_err(|e| OffsetStoreError::Corrupt {
                key: key.to_string(),
                value: e.value,
            })
    }

    async fn save(&self, key: &CheckpointKey, cursor: Cursor) -> Result<(), OffsetStoreError> {
        let url = self.key_url(key);
        let response = self
            .authorize(self.client.put(url))
            .body(cursor.encode())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OffsetStoreError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // Consul answers a KV PUT with a bare `true` or `false`
        let body = response.text().await?;
        if body.trim() != "true" {
            return Err(OffsetStoreError::Rejected {
                key: key.to_string(),
            });
        }

        tracing::trace!(key = %key, cursor = %cursor, "Cursor written to consul");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store(address: &str) -> ConsulOffsetStore {
        ConsulOffsetStore::new(&ConsulStoreConfig {
            address: address.to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_key_url_keeps_path_separators() {
        let store = store("http://127.0.0.1:8500");
        let url = store.key_url(&CheckpointKey::from("cwtail/api/web/abc 1"));
        assert_eq!(url.as_str(), "http://127.0.0.1:8500/v1/kv/cwtail/api/web/abc%201");
    }

    #[test]
    fn test_address_with_path_prefix() {
        let store = store("http://consul.internal/proxy/");
        let url = store.key_url(&CheckpointKey::from("ns/stream"));
        assert_eq!(url.as_str(), "http://consul.internal/proxy/v1/kv/ns/stream");
    }

    #[test]
    fn test_invalid_address() {
        let result = ConsulOffsetStore::new(&ConsulStoreConfig {
            address: "not a url".to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(OffsetStoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let store = ConsulOffsetStore::new(&ConsulStoreConfig {
            address: "http://127.0.0.1:8500".to_string(),
            token: Some(String::new()),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert!(store.token.is_none());
    }
}
