//! Execution tracing: ordered timelines and live event envelopes.
//!
//! The [`Tracer`] observes execution step boundaries and turns them into two
//! coupled outputs:
//!
//! - an append-only **timeline** of [`TimelineEntry`] records, one per
//!   lifecycle transition, whose append order is guaranteed to match the
//!   wall-clock start order of the events it records - even across
//!   concurrent sub-agent runs, because every entry's sequence number is
//!   allocated under the shared append lock before the event is released;
//! - a stream of transport-ready [`EventEnvelope`]s forwarded to the
//!   [`EventBus`] for live consumption.
//!
//! The tracer is the single point that computes elapsed time: durations on
//! end events are derived from the matching start event's timestamp, so
//! node executors never self-report timing and clocks stay consistent
//! across nested runs.
//!
//! Cloning a tracer is cheap; [`Tracer::child_context`] produces a handle
//! that shares the parent's timeline but carries a child
//! [`ExecutionContext`] with incremented depth and an extended execution
//! path. The context tree lives in an arena indexed by execution id and is
//! torn down with the run.
//!
//! # Recording vs. emit-only operations
//!
//! `on_run_start`, `on_node_start`, `on_node_end`, and `on_run_end` both
//! append a timeline entry and forward an envelope. The finer-grained
//! progress operations (`on_phase_*`, `on_iteration_*`, `on_progress`,
//! `on_state_update`, `on_run_error`) forward envelopes only - they narrate
//! execution for live consumers without bloating the persisted timeline.

mod bus;
mod context;
mod envelope;
mod sink;

pub use bus::EventBus;
pub use context::{ContextArena, ExecutionContext};
pub use envelope::{EventEnvelope, EventType};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::types::{NodeStatus, RunStatus};

/// One immutable record in the execution timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Strictly increasing across the whole run tree.
    pub sequence: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Elapsed time computed from the matching start entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Execution context plus event-specific fields.
    #[serde(default)]
    pub metadata: Value,
}

struct Timeline {
    entries: Vec<TimelineEntry>,
    next_sequence: u64,
}

struct TracerShared {
    timeline: Mutex<Timeline>,
    node_outputs: Mutex<FxHashMap<String, Value>>,
    node_order: Mutex<Vec<String>>,
    starts: Mutex<FxHashMap<(String, String), DateTime<Utc>>>,
    arena: Mutex<ContextArena>,
    emitter: Option<flume::Sender<EventEnvelope>>,
}

/// Observes execution and produces the timeline plus live envelopes.
#[derive(Clone)]
pub struct Tracer {
    shared: Arc<TracerShared>,
    context: ExecutionContext,
}

impl Tracer {
    /// Tracer for a new top-level run, without live forwarding.
    #[must_use]
    pub fn new(run_name: &str) -> Self {
        Self::build(run_name, None)
    }

    /// Tracer for a new top-level run that forwards envelopes to an event
    /// bus sender.
    #[must_use]
    pub fn with_emitter(run_name: &str, emitter: flume::Sender<EventEnvelope>) -> Self {
        Self::build(run_name, Some(emitter))
    }

    fn build(run_name: &str, emitter: Option<flume::Sender<EventEnvelope>>) -> Self {
        let context = ExecutionContext::root(run_name);
        let mut arena = ContextArena::new();
        arena.insert(context.clone());
        Self {
            shared: Arc::new(TracerShared {
                timeline: Mutex::new(Timeline {
                    entries: Vec::new(),
                    next_sequence: 0,
                }),
                node_outputs: Mutex::new(FxHashMap::default()),
                node_order: Mutex::new(Vec::new()),
                starts: Mutex::new(FxHashMap::default()),
                arena: Mutex::new(arena),
                emitter,
            }),
            context,
        }
    }

    /// The execution context this handle records under.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Create a handle for a nested sub-agent run.
    ///
    /// The child shares the parent's timeline (entries interleave by
    /// sequence) but records under its own context with `depth + 1` and an
    /// extended execution path. The context is registered in the arena.
    #[must_use]
    pub fn child_context(&self, sub_id: &str, sub_name: &str) -> Tracer {
        let child = self.context.child(sub_id, sub_name);
        self.shared.arena.lock().insert(child.clone());
        Tracer {
            shared: self.shared.clone(),
            context: child,
        }
    }

    // ------------------------------------------------------------------
    // Recording operations (append a timeline entry + forward an envelope)
    // ------------------------------------------------------------------

    /// Record the start of this run. Emits `agent_start` for the top-level
    /// run and `subagent_start` for nested runs.
    pub fn on_run_start(&self) -> EventEnvelope {
        self.mark_start("run");
        let event_type = if self.context.is_root() {
            EventType::AgentStart
        } else {
            EventType::SubagentStart
        };
        let mut extra = Map::new();
        extra.insert("name".to_string(), json!(self.run_name()));
        if let Some(parent) = &self.context.parent_execution_id {
            extra.insert("parent_execution_id".to_string(), json!(parent));
        }
        self.record(event_type, None, None, None, None, extra)
    }

    /// Record the end of this run with its terminal status. Duration is
    /// computed from the matching `on_run_start`.
    pub fn on_run_end(&self, status: RunStatus) -> EventEnvelope {
        let duration_ms = self.elapsed_since_start("run");
        let event_type = if self.context.is_root() {
            EventType::AgentEnd
        } else {
            EventType::SubagentEnd
        };
        let mut extra = Map::new();
        extra.insert("name".to_string(), json!(self.run_name()));
        self.record(
            event_type,
            None,
            Some(status.as_str()),
            duration_ms,
            None,
            extra,
        )
    }

    /// Record a node beginning execution.
    pub fn on_node_start(
        &self,
        node_id: &str,
        node_type: &str,
        component_key: Option<&str>,
    ) -> EventEnvelope {
        self.mark_start(&format!("node:{node_id}"));
        self.shared.node_order.lock().push(node_id.to_string());
        let mut extra = Map::new();
        extra.insert("node_type".to_string(), json!(node_type));
        if let Some(key) = component_key {
            extra.insert("component_key".to_string(), json!(key));
        }
        self.record(EventType::NodeStart, Some(node_id), None, None, None, extra)
    }

    /// Record a node finishing execution. Completed outputs are retained in
    /// the per-node output map; duration comes from the matching
    /// `on_node_start`.
    pub fn on_node_end(
        &self,
        node_id: &str,
        status: NodeStatus,
        output: Option<Value>,
    ) -> EventEnvelope {
        let duration_ms = self.elapsed_since_start(&format!("node:{node_id}"));
        if status == NodeStatus::Completed
            && let Some(output) = &output
        {
            self.shared
                .node_outputs
                .lock()
                .insert(node_id.to_string(), output.clone());
        }
        self.record(
            EventType::NodeEnd,
            Some(node_id),
            Some(status.as_str()),
            duration_ms,
            output,
            Map::new(),
        )
    }

    // ------------------------------------------------------------------
    // Emit-only operations (forward an envelope, no timeline entry)
    // ------------------------------------------------------------------

    /// Forward an `agent_error` envelope. The failure itself is recorded on
    /// the failing node's `node_end`; the timeline ends there.
    pub fn on_run_error(&self, message: &str) -> EventEnvelope {
        let mut extra = Map::new();
        extra.insert("message".to_string(), json!(message));
        self.emit_only(EventType::AgentError, None, extra)
    }

    /// Forward a `phase_start` envelope for a named sub-stage of a node.
    pub fn on_phase_start(&self, name: &str) -> EventEnvelope {
        self.mark_start(&format!("phase:{name}"));
        let mut extra = Map::new();
        extra.insert("phase".to_string(), json!(name));
        self.emit_only(EventType::PhaseStart, None, extra)
    }

    /// Forward a `phase_end` envelope; duration from the matching start.
    pub fn on_phase_end(&self, name: &str) -> EventEnvelope {
        let duration_ms = self.elapsed_since_start(&format!("phase:{name}"));
        let mut extra = Map::new();
        extra.insert("phase".to_string(), json!(name));
        if let Some(d) = duration_ms {
            extra.insert("duration_ms".to_string(), json!(d));
        }
        self.emit_only(EventType::PhaseEnd, None, extra)
    }

    /// Forward an `iteration_start` envelope for a repeated node visit.
    pub fn on_iteration_start(&self, node_id: &str, iteration: u32) -> EventEnvelope {
        self.mark_start(&format!("iter:{node_id}:{iteration}"));
        let mut extra = Map::new();
        extra.insert("iteration".to_string(), json!(iteration));
        self.emit_only(EventType::IterationStart, Some(node_id), extra)
    }

    /// Forward an `iteration_end` envelope.
    pub fn on_iteration_end(&self, node_id: &str, iteration: u32) -> EventEnvelope {
        let duration_ms = self.elapsed_since_start(&format!("iter:{node_id}:{iteration}"));
        let mut extra = Map::new();
        extra.insert("iteration".to_string(), json!(iteration));
        if let Some(d) = duration_ms {
            extra.insert("duration_ms".to_string(), json!(d));
        }
        self.emit_only(EventType::IterationEnd, Some(node_id), extra)
    }

    /// Forward a `progress_update` envelope.
    pub fn on_progress(&self, message: &str, fraction: Option<f64>) -> EventEnvelope {
        let mut extra = Map::new();
        extra.insert("message".to_string(), json!(message));
        if let Some(fraction) = fraction {
            extra.insert("fraction".to_string(), json!(fraction));
        }
        self.emit_only(EventType::ProgressUpdate, None, extra)
    }

    /// Forward a `state_update` envelope after a reducer application.
    pub fn on_state_update(&self, field: &str, reducer: &str) -> EventEnvelope {
        let mut extra = Map::new();
        extra.insert("field".to_string(), json!(field));
        extra.insert("reducer".to_string(), json!(reducer));
        self.emit_only(EventType::StateUpdate, None, extra)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Snapshot of the timeline so far (shared across the whole run tree).
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.shared.timeline.lock().entries.clone()
    }

    /// Per-node recorded outputs.
    #[must_use]
    pub fn node_outputs(&self) -> FxHashMap<String, Value> {
        self.shared.node_outputs.lock().clone()
    }

    /// Order in which nodes started executing.
    #[must_use]
    pub fn node_order(&self) -> Vec<String> {
        self.shared.node_order.lock().clone()
    }

    /// Look up a context in the arena by execution id.
    #[must_use]
    pub fn context_of(&self, execution_id: &str) -> Option<ExecutionContext> {
        self.shared.arena.lock().get(execution_id).cloned()
    }

    /// Number of contexts (root plus sub-agents) registered so far.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.shared.arena.lock().len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn run_name(&self) -> &str {
        self.context
            .execution_path
            .last()
            .map(String::as_str)
            .unwrap_or("run")
    }

    fn mark_start(&self, key: &str) {
        self.shared.starts.lock().insert(
            (self.context.execution_id.clone(), key.to_string()),
            Utc::now(),
        );
    }

    fn elapsed_since_start(&self, key: &str) -> Option<u64> {
        let started = self
            .shared
            .starts
            .lock()
            .remove(&(self.context.execution_id.clone(), key.to_string()))?;
        let elapsed = Utc::now().signed_duration_since(started);
        Some(elapsed.num_milliseconds().max(0) as u64)
    }

    fn context_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "execution_id".to_string(),
            json!(self.context.execution_id),
        );
        map.insert("depth".to_string(), json!(self.context.depth));
        map.insert(
            "execution_path".to_string(),
            json!(self.context.execution_path),
        );
        map
    }

    fn record(
        &self,
        event_type: EventType,
        node_id: Option<&str>,
        status: Option<&str>,
        duration_ms: Option<u64>,
        output: Option<Value>,
        extra: Map<String, Value>,
    ) -> EventEnvelope {
        let mut metadata = self.context_fields();
        metadata.extend(extra);

        // Sequence and timestamp are taken under the append lock so timeline
        // order always matches event order, even across concurrent children.
        let entry = {
            let mut timeline = self.shared.timeline.lock();
            let timestamp = Utc::now();
            let entry = TimelineEntry {
                sequence: timeline.next_sequence,
                event_type,
                timestamp,
                node_id: node_id.map(str::to_string),
                status: status.map(str::to_string),
                duration_ms,
                output,
                metadata: Value::Object(metadata),
            };
            timeline.next_sequence += 1;
            timeline.entries.push(entry.clone());
            entry
        };

        let envelope = envelope_for(&entry);
        self.forward(&envelope);
        envelope
    }

    fn emit_only(
        &self,
        event_type: EventType,
        node_id: Option<&str>,
        extra: Map<String, Value>,
    ) -> EventEnvelope {
        let mut data = self.context_fields();
        if let Some(node_id) = node_id {
            data.insert("node_id".to_string(), json!(node_id));
        }
        data.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
        data.extend(extra);
        let envelope = EventEnvelope::new(event_type, Value::Object(data));
        self.forward(&envelope);
        envelope
    }

    fn forward(&self, envelope: &EventEnvelope) {
        if let Some(emitter) = &self.shared.emitter
            && emitter.send(envelope.clone()).is_err()
        {
            tracing::warn!(event_type = %envelope.event_type, "event bus unavailable");
        }
    }
}

fn envelope_for(entry: &TimelineEntry) -> EventEnvelope {
    let mut data = entry
        .metadata
        .as_object()
        .cloned()
        .unwrap_or_default();
    if let Some(node_id) = &entry.node_id {
        data.insert("node_id".to_string(), json!(node_id));
    }
    if let Some(status) = &entry.status {
        data.insert("status".to_string(), json!(status));
    }
    if let Some(duration_ms) = entry.duration_ms {
        data.insert("duration_ms".to_string(), json!(duration_ms));
    }
    if let Some(output) = &entry.output {
        data.insert("output".to_string(), output.clone());
    }
    data.insert(
        "timestamp".to_string(),
        json!(entry.timestamp.to_rfc3339()),
    );
    data.insert("sequence".to_string(), json!(entry.sequence));
    EventEnvelope::new(entry.event_type, Value::Object(data))
}
