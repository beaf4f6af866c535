//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::json;

use weftrun::definition::{Edge, GraphDefinition, NodeSpec, StateFieldSchema};
use weftrun::engine::{ExecutorError, ExecutorOutput, NodeCtx, NodeExecutor};
use weftrun::state::StateSnapshot;
use weftrun::tracer::{EventType, TimelineEntry};
use weftrun::types::END;

/// One scripted behavior for a node visit.
#[derive(Clone)]
pub enum Script {
    Return(ExecutorOutput),
    Fail(String),
    /// Sleeps far beyond any test deadline; used for timeout scenarios.
    Hang,
    Sleep(Duration, ExecutorOutput),
}

/// Executor whose behavior is scripted per node id.
///
/// Visits pop scripts front-to-back; the last script repeats for any
/// further visits. Unscripted nodes return `"<id> output"`.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<FxHashMap<String, VecDeque<Script>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, node_id: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .entry(node_id.to_string())
            .or_default()
            .push_back(script);
        self
    }
}

#[async_trait]
impl NodeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        node: &NodeSpec,
        _snapshot: StateSnapshot,
        _ctx: NodeCtx,
    ) -> Result<ExecutorOutput, ExecutorError> {
        let script = {
            let mut scripts = self.scripts.lock();
            scripts.get_mut(&node.id).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };
        match script {
            None => Ok(ExecutorOutput::value(json!(format!("{} output", node.id)))),
            Some(Script::Return(output)) => Ok(output),
            Some(Script::Fail(cause)) => Err(ExecutorError::new(&node.id, cause)),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ExecutorError::new(&node.id, "hang script returned"))
            }
            Some(Script::Sleep(duration, output)) => {
                tokio::time::sleep(duration).await;
                Ok(output)
            }
        }
    }
}

/// A linear chain of transform nodes: `ids[0] -> ids[1] -> ... -> END`.
///
/// Each node writes its own id as output key (replace semantics).
pub fn linear_graph(ids: &[&str]) -> GraphDefinition {
    let mut def = GraphDefinition::empty();
    def.entry_point = ids[0].to_string();
    for id in ids {
        def.nodes.push(NodeSpec::transform(id, id, id));
        def.state_schema
            .insert(id.to_string(), StateFieldSchema::value());
    }
    for pair in ids.windows(2) {
        def.edges.push(Edge::new(pair[0], pair[1]));
    }
    def.edges
        .push(Edge::new(ids[ids.len() - 1], END));
    def
}

/// The event types of a timeline, in sequence order.
pub fn event_types(timeline: &[TimelineEntry]) -> Vec<EventType> {
    timeline.iter().map(|e| e.event_type).collect()
}

/// Timeline entries of one event type.
pub fn entries_of(timeline: &[TimelineEntry], event_type: EventType) -> Vec<TimelineEntry> {
    timeline
        .iter()
        .filter(|e| e.event_type == event_type)
        .cloned()
        .collect()
}
