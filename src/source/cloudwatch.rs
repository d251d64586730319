use super::sigv4::{Credentials, Signer};
use super::types::{EventPage, EventsRequest, LogEvent, LogSource, SourceError, StreamId, StreamPage};
use crate::config::types::AwsConfig;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::{Deserialize, Serialize};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "Logs_20140328";
const SERVICE: &str = "logs";

/// CloudWatch Logs client speaking the JSON 1.1 protocol with SigV4 signing.
#[derive(Debug)]
pub struct CloudWatchClient {
    endpoint: Url,
    host: String,
    signer: Signer,
    client: reqwest::Client,
}

impl CloudWatchClient {
    pub fn new(config: &AwsConfig) -> Result<Self, SourceError> {
        let credentials = resolve_credentials(config)?;
        let endpoint_str = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://logs.{}.amazonaws.com", config.region));
        let endpoint = Url::parse(&endpoint_str).map_err(|e| {
            SourceError::InvalidConfig(format!("invalid endpoint '{}': {}", endpoint_str, e))
        })?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(SourceError::InvalidConfig(format!(
                    "endpoint '{}' has no host",
                    endpoint_str
                )))
            }
        };

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint,
            host,
            signer: Signer::new(credentials, config.region.clone(), SERVICE),
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, SourceError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let payload = serde_json::to_vec(body)?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);
        let signed = self
            .signer
            .sign_post(&self.host, CONTENT_TYPE, &target, &payload, Utc::now());

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn resolve_credentials(config: &AwsConfig) -> Result<Credentials, SourceError> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    let access_key = non_empty(config.access_key.clone())
        .or_else(|| non_empty(std::env::var("AWS_ACCESS_KEY_ID").ok()));
    let secret_key = non_empty(config.secret_key.clone())
        .or_else(|| non_empty(std::env::var("AWS_SECRET_ACCESS_KEY").ok()));
    let session_token = non_empty(config.session_token.clone())
        .or_else(|| non_empty(std::env::var("AWS_SESSION_TOKEN").ok()));

    match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) => Ok(Credentials {
            access_key,
            secret_key,
            session_token,
        }),
        _ => Err(SourceError::Credentials(
            "set aws.access_key/aws.secret_key or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY".to_string(),
        )),
    }
}

fn api_error(status: u16, body: &[u8]) -> SourceError {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(rename = "__type", default)]
        error_type: Option<String>,
        #[serde(alias = "Message", default)]
        message: Option<String>,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => SourceError::Api {
            status,
            // `__type` may be namespaced as `prefix#Code`
            code: parsed
                .error_type
                .map(|t| t.rsplit('#').next().unwrap_or_default().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            message: parsed.message.unwrap_or_default(),
        },
        Err(_) => SourceError::Api {
            status,
            code: "Unknown".to_string(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

// ===== Wire Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_stream_name_prefix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStreamEntry>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogStreamEntry {
    log_stream_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
    limit: u32,
    start_from_head: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetLogEventsResponse {
    #[serde(default)]
    events: Vec<WireEvent>,
    #[serde(default)]
    next_forward_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    timestamp: i64,
    #[serde(default)]
    ingestion_time: Option<i64>,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl LogSource for CloudWatchClient {
    async fn describe_log_streams(
        &self,
        log_group_name: &str,
        prefix: &str,
        next_token: Option<String>,
    ) -> Result<StreamPage, SourceError> {
        let request = DescribeLogStreamsRequest {
            log_group_name,
            log_stream_name_prefix: Some(prefix).filter(|p| !p.is_empty()),
            next_token,
        };
        let response: DescribeLogStreamsResponse = self.call("DescribeLogStreams", &request).await?;

        Ok(StreamPage {
            streams: response
                .log_streams
                .into_iter()
                .map(|s| StreamId::new(s.log_stream_name))
                .collect(),
            next_token: response.next_token,
        })
    }

    async fn get_log_events(&self, request: &EventsRequest) -> Result<EventPage, SourceError> {
        let wire = GetLogEventsRequest {
            log_group_name: &request.log_group_name,
            log_stream_name: &request.log_stream_name,
            start_time: request.start_time,
            next_token: request.next_token.as_deref(),
            limit: request.limit,
            start_from_head: true,
        };
        let response: GetLogEventsResponse = self.call("GetLogEvents", &wire).await?;

        Ok(EventPage {
            events: response
                .events
                .into_iter()
                .map(|e| LogEvent {
                    timestamp: e.timestamp,
                    ingestion_time: e.ingestion_time,
                    message: e.message,
                })
                .collect(),
            next_forward_token: response.next_forward_token,
        })
    }
}
