//! Step event stream
//!
//! Every step returns a finite, causally ordered sequence of events next
//! to the new state. Events enable:
//! - Rendering a narrative of the step to the player
//! - Auditing failures (which rule flipped `has_failed`, and when)
//! - Replay identity checks (two equal-seed runs log equal events)

use serde::{Deserialize, Serialize};

/// How serious an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry in the step's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Epoch milliseconds of the simulated date the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Event {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            id: None,
            timestamp: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            id: None,
            timestamp: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            id: None,
            timestamp: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Some(ts);
        self
    }
}

/// Ordered event accumulator for one step.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events at the given severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.severity == severity)
            .collect()
    }

    /// True if any error-severity event was logged.
    pub fn has_errors(&self) -> bool {
        self.events.iter().any(|e| e.severity == Severity::Error)
    }

    /// Consume the log, yielding the ordered event sequence.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
