use super::types::{EventPage, EventsRequest, LogEvent, LogSource, SourceError, StreamId, StreamPage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct GroupState {
    streams: Vec<StreamId>,
    events: HashMap<StreamId, Vec<LogEvent>>,
}

#[derive(Debug, Default)]
struct State {
    groups: HashMap<String, GroupState>,
    failing_groups: HashSet<String>,
    pending_poll_failures: HashMap<StreamId, u32>,
    requests: Vec<EventsRequest>,
}

/// Log source held entirely in memory.
///
/// Streams are listed in insertion order and events are returned in append order, which lets
/// callers model sources whose timestamps are not strictly sorted. Failures can be injected
/// per group (listing) and per stream (polling).
#[derive(Debug)]
pub struct InMemoryLogSource {
    state: Mutex<State>,
    stream_page_size: usize,
    honor_prefix: bool,
}

impl Default for InMemoryLogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLogSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            stream_page_size: 50,
            honor_prefix: true,
        }
    }

    /// Number of streams returned per listing page.
    pub fn with_stream_page_size(mut self, size: usize) -> Self {
        self.stream_page_size = size.max(1);
        self
    }

    /// Return every stream regardless of the requested prefix.
    pub fn ignoring_prefix(mut self) -> Self {
        self.honor_prefix = false;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_stream(&self, group: &str, stream: &str) {
        let mut state = self.lock();
        let group_state = state.groups.entry(group.to_string()).or_default();
        let id = StreamId::from(stream);
        if !group_state.streams.contains(&id) {
            group_state.streams.push(id.clone());
            group_state.events.entry(id).or_default();
        }
    }

    /// Append events to a stream, creating it if needed.
    pub fn append(&self, group: &str, stream: &str, events: impl IntoIterator<Item = LogEvent>) {
        self.add_stream(group, stream);
        let mut state = self.lock();
        if let Some(group_state) = state.groups.get_mut(group) {
            group_state
                .events
                .entry(StreamId::from(stream))
                .or_default()
                .extend(events);
        }
    }

    pub fn fail_listing(&self, group: &str) {
        self.lock().failing_groups.insert(group.to_string());
    }

    /// Make the next `count` polls of `stream` fail.
    pub fn fail_next_polls(&self, stream: &str, count: u32) {
        self.lock()
            .pending_poll_failures
            .insert(StreamId::from(stream), count);
    }

    /// Every event request received so far, in order.
    pub fn requests(&self) -> Vec<EventsRequest> {
        self.lock().requests.clone()
    }
}

fn parse_token(token: &str, prefix: &str) -> Result<usize, SourceError> {
    token
        .strip_prefix(prefix)
        .and_then(|rest| rest.parse().ok())
        .ok_or_else(|| SourceError::Api {
            status: 400,
            code: "InvalidParameterException".to_string(),
            message: format!("invalid token '{}'", token),
        })
}

#[async_trait]
impl LogSource for InMemoryLogSource {
    async fn describe_log_streams(
        &self,
        log_group_name: &str,
        prefix: &str,
        next_token: Option<String>,
    ) -> Result<StreamPage, SourceError> {
        let state = self.lock();
        if state.failing_groups.contains(log_group_name) {
            return Err(SourceError::Unavailable(format!(
                "listing streams of {} failed",
                log_group_name
            )));
        }

        let group = state.groups.get(log_group_name).ok_or_else(|| SourceError::Api {
            status: 400,
            code: "ResourceNotFoundException".to_string(),
            message: "The specified log group does not exist.".to_string(),
        })?;

        let candidates: Vec<&StreamId> = group
            .streams
            .iter()
            .filter(|s| !self.honor_prefix || s.as_str().starts_with(prefix))
            .collect();

        let start = match next_token {
            Some(token) => parse_token(&token, "s/")?,
            None => 0,
        };
        let end = (start + self.stream_page_size).min(candidates.len());
        let streams = candidates
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|s| (*s).clone())
            .collect();

        Ok(StreamPage {
            streams,
            next_token: (end < candidates.len()).then(|| format!("s/{}", end)),
        })
    }

    async fn get_log_events(&self, request: &EventsRequest) -> Result<EventPage, SourceError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        let stream_id = StreamId::from(request.log_stream_name.as_str());
        if let Some(remaining) = state.pending_poll_failures.get_mut(&stream_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::Unavailable(format!(
                    "injected poll failure for {}",
                    stream_id
                )));
            }
        }

        let events = state
            .groups
            .get(&request.log_group_name)
            .and_then(|g| g.events.get(&stream_id))
            .ok_or_else(|| SourceError::Api {
                status: 400,
                code: "ResourceNotFoundException".to_string(),
                message: "The specified log stream does not exist.".to_string(),
            })?;

        let limit = request.limit.max(1) as usize;
        let (positions, scanned_to): (Vec<usize>, usize) = match &request.next_token {
            Some(token) => {
                let start = parse_token(token, "f/")?.min(events.len());
                let end = (start + limit).min(events.len());
                ((start..end).collect(), end)
            }
            None => {
                let start_time = request.start_time.unwrap_or(i64::MIN);
                let positions: Vec<usize> = events
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.timestamp >= start_time)
                    .map(|(i, _)| i)
                    .take(limit)
                    .collect();
                let scanned_to = if positions.len() == limit {
                    positions.last().map(|i| i + 1).unwrap_or(0)
                } else {
                    events.len()
                };
                (positions, scanned_to)
            }
        };

        Ok(EventPage {
            events: positions.iter().map(|&i| events[i].clone()).collect(),
            next_forward_token: Some(format!("f/{}", scanned_to)),
        })
    }
}
