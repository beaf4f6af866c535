//! Transport-ready event envelopes.
//!
//! Every tracer operation yields an [`EventEnvelope`] suitable for live
//! forwarding to a transport sink. The envelope is a `{type, data}` pair;
//! `data` is a JSON object carrying the execution context (id, depth, path),
//! a timestamp, and event-specific fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle event vocabulary emitted by the tracer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgentStart,
    AgentEnd,
    AgentError,
    NodeStart,
    NodeEnd,
    PhaseStart,
    PhaseEnd,
    SubagentStart,
    SubagentEnd,
    ProgressUpdate,
    IterationStart,
    IterationEnd,
    StateUpdate,
}

impl EventType {
    /// Wire form of the event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::AgentStart => "agent_start",
            EventType::AgentEnd => "agent_end",
            EventType::AgentError => "agent_error",
            EventType::NodeStart => "node_start",
            EventType::NodeEnd => "node_end",
            EventType::PhaseStart => "phase_start",
            EventType::PhaseEnd => "phase_end",
            EventType::SubagentStart => "subagent_start",
            EventType::SubagentEnd => "subagent_end",
            EventType::ProgressUpdate => "progress_update",
            EventType::IterationStart => "iteration_start",
            EventType::IterationEnd => "iteration_end",
            EventType::StateUpdate => "state_update",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event as forwarded to the live event sink.
///
/// Serializes to `{"type": "...", "data": {...}}`.
///
/// # Example
///
/// ```
/// use weftrun::tracer::{EventEnvelope, EventType};
///
/// let envelope = EventEnvelope::new(
///     EventType::ProgressUpdate,
///     serde_json::json!({"message": "halfway"}),
/// );
/// let json = serde_json::to_value(&envelope).unwrap();
/// assert_eq!(json["type"], "progress_update");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: Value,
}

impl EventEnvelope {
    #[must_use]
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self { event_type, data }
    }

    /// Node id carried in the payload, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        self.data.get("node_id").and_then(Value::as_str)
    }

    /// Status carried in the payload, if any.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.data.get("status").and_then(Value::as_str)
    }
}

impl fmt::Display for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_id() {
            Some(node_id) => write!(f, "[{}] {}", self.event_type, node_id),
            None => write!(f, "[{}]", self.event_type),
        }
    }
}
