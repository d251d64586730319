use crate::source::LogEvent;
use serde::Serialize;

/// Ordered, non-empty run of events fetched by one poll of one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Batch {
    events: Vec<LogEvent>,
}

impl Batch {
    /// Returns `None` for an empty event list.
    pub fn new(events: Vec<LogEvent>) -> Option<Self> {
        if events.is_empty() {
            None
        } else {
            Some(Self { events })
        }
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Largest timestamp in the batch. Events are not assumed to be sorted.
    pub fn max_timestamp(&self) -> i64 {
        self.events
            .iter()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or(i64::MIN)
    }
}
