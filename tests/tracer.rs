//! Tracer behavior: timeline recording, durations, envelope forwarding,
//! child contexts.

use std::time::Duration;

use serde_json::json;

use weftrun::tracer::{EventBus, EventType, MemorySink, Tracer};
use weftrun::types::{NodeStatus, RunStatus};

mod common;
use common::event_types;

#[test]
fn recording_operations_append_and_return_envelopes() {
    let tracer = Tracer::new("demo");

    let start = tracer.on_run_start();
    assert_eq!(start.event_type, EventType::AgentStart);
    assert_eq!(start.data["name"], "demo");
    assert_eq!(start.data["depth"], 0);

    let node_start = tracer.on_node_start("fetch", "tool", Some("execute-tools"));
    assert_eq!(node_start.event_type, EventType::NodeStart);
    assert_eq!(node_start.data["node_id"], "fetch");
    assert_eq!(node_start.data["component_key"], "execute-tools");

    let node_end = tracer.on_node_end("fetch", NodeStatus::Completed, Some(json!("ok")));
    assert_eq!(node_end.event_type, EventType::NodeEnd);
    assert_eq!(node_end.data["status"], "completed");
    assert!(node_end.data["duration_ms"].is_u64());

    let end = tracer.on_run_end(RunStatus::Completed);
    assert_eq!(end.event_type, EventType::AgentEnd);
    assert_eq!(end.data["status"], "completed");

    assert_eq!(
        event_types(&tracer.timeline()),
        vec![
            EventType::AgentStart,
            EventType::NodeStart,
            EventType::NodeEnd,
            EventType::AgentEnd,
        ]
    );
    assert_eq!(tracer.node_order(), vec!["fetch"]);
    assert_eq!(tracer.node_outputs().get("fetch"), Some(&json!("ok")));
}

#[test]
fn failed_nodes_do_not_record_outputs() {
    let tracer = Tracer::new("demo");
    tracer.on_node_start("broken", "llm", None);
    tracer.on_node_end("broken", NodeStatus::Failed, None);
    assert!(tracer.node_outputs().is_empty());
}

#[tokio::test]
async fn durations_come_from_the_matching_start_event() {
    let tracer = Tracer::new("demo");
    tracer.on_node_start("slow", "transform", None);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let end = tracer.on_node_end("slow", NodeStatus::Completed, None);

    let duration = end.data["duration_ms"].as_u64().unwrap();
    assert!((40..5_000).contains(&duration), "duration {duration}ms");
}

#[test]
fn emit_only_operations_do_not_touch_the_timeline() {
    let tracer = Tracer::new("demo");
    tracer.on_run_start();
    let before = tracer.timeline().len();

    let progress = tracer.on_progress("halfway", Some(0.5));
    assert_eq!(progress.event_type, EventType::ProgressUpdate);
    assert_eq!(progress.data["fraction"], 0.5);

    tracer.on_phase_start("render");
    tracer.on_phase_end("render");
    tracer.on_iteration_start("loop", 2);
    tracer.on_iteration_end("loop", 2);
    let state_update = tracer.on_state_update("messages", "merge-messages");
    assert_eq!(state_update.data["field"], "messages");
    let error = tracer.on_run_error("boom");
    assert_eq!(error.event_type, EventType::AgentError);
    assert_eq!(error.data["message"], "boom");

    assert_eq!(tracer.timeline().len(), before);
}

#[test]
fn child_contexts_extend_depth_and_path() {
    let tracer = Tracer::new("root");
    let child = tracer.child_context("exec-child", "researcher");
    let grandchild = child.child_context("exec-grandchild", "summarizer");

    assert_eq!(child.context().depth, 1);
    assert_eq!(grandchild.context().depth, 2);
    assert_eq!(
        grandchild.context().path_string(),
        "root > researcher > summarizer"
    );
    assert_eq!(tracer.context_count(), 3);

    // Child run boundaries use the subagent event types.
    let start = child.on_run_start();
    assert_eq!(start.event_type, EventType::SubagentStart);
    let end = child.on_run_end(RunStatus::Completed);
    assert_eq!(end.event_type, EventType::SubagentEnd);

    // Shared timeline, one sequence domain.
    let timeline = tracer.timeline();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].sequence, 0);
    assert_eq!(timeline[1].sequence, 1);
}

#[tokio::test]
async fn envelopes_are_forwarded_to_the_event_bus() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen();

    let tracer = Tracer::with_emitter("streamed", bus.sender());
    tracer.on_run_start();
    tracer.on_node_start("a", "transform", None);
    tracer.on_progress("working", None);
    tracer.on_node_end("a", NodeStatus::Completed, Some(json!("done")));
    tracer.on_run_end(RunStatus::Completed);

    // Let the listener drain, then stop it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.stop_listener().await;

    let received = sink.snapshot();
    let types: Vec<EventType> = received.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::AgentStart,
            EventType::NodeStart,
            EventType::ProgressUpdate,
            EventType::NodeEnd,
            EventType::AgentEnd,
        ]
    );

    // Forwarded recording events carry their timeline sequence.
    assert_eq!(received[0].data["sequence"], 0);
    assert_eq!(received[3].data["sequence"], 2);
}

#[test]
fn envelope_wire_format_matches_the_event_vocabulary() {
    let tracer = Tracer::new("wire");
    let envelope = tracer.on_run_start();
    let wire = serde_json::to_value(&envelope).unwrap();
    assert_eq!(wire["type"], "agent_start");
    assert!(wire["data"]["execution_id"].as_str().unwrap().starts_with("exec-"));
    assert!(wire["data"]["timestamp"].is_string());
}
