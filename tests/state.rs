//! State container behavior: seeding, reducer dispatch, snapshots.

use serde_json::json;

use weftrun::definition::{StateFieldSchema, StateSchema};
use weftrun::message::{Message, ToolCall};
use weftrun::state::{MESSAGES_FIELD, StateContainer};

fn schema() -> StateSchema {
    let mut schema = StateSchema::default();
    schema.insert(MESSAGES_FIELD.to_string(), StateFieldSchema::messages());
    schema.insert("findings".to_string(), StateFieldSchema::list());
    schema.insert(
        "status".to_string(),
        StateFieldSchema::value_with_default(json!("idle")),
    );
    schema
}

#[test]
fn fields_are_seeded_from_defaults() {
    let state = StateContainer::new(&schema());
    assert_eq!(state.get("status"), Some(&json!("idle")));
    assert_eq!(state.get(MESSAGES_FIELD), Some(&json!([])));
    assert_eq!(state.get("findings"), Some(&json!([])));
    assert_eq!(state.get("absent"), None);
}

#[test]
fn apply_routes_through_schema_reducers() {
    let mut state = StateContainer::new(&schema());
    state.apply("findings", json!(["a"])).unwrap();
    state.apply("findings", json!(["b"])).unwrap();
    state.apply("status", json!("running")).unwrap();
    state.apply("status", json!("done")).unwrap();

    assert_eq!(state.get("findings"), Some(&json!(["a", "b"])));
    assert_eq!(state.get("status"), Some(&json!("done")));
}

#[test]
fn undeclared_fields_start_empty_and_replace() {
    let mut state = StateContainer::new(&schema());
    state.apply("scratch", json!({"n": 1})).unwrap();
    state.apply("scratch", json!({"n": 2})).unwrap();
    assert_eq!(state.get("scratch"), Some(&json!({"n": 2})));
}

#[test]
fn snapshots_are_consistent_views() {
    let mut state = StateContainer::new(&schema());
    state.push_message(Message::user("hi"));
    let snapshot = state.snapshot();

    state.push_message(Message::assistant("hello"));

    assert_eq!(snapshot.messages().len(), 1);
    assert_eq!(state.snapshot().messages().len(), 2);
}

#[test]
fn tool_call_inspection_tracks_latest_assistant_message() {
    let mut state = StateContainer::new(&schema());
    state.push_message(Message::user("look this up"));
    assert!(!state.has_pending_tool_calls());

    state.push_message(
        Message::assistant("on it").with_tool_calls(vec![ToolCall::new(
            "c1",
            "lookup",
            json!({"q": "x"}),
        )]),
    );
    assert!(state.has_pending_tool_calls());
    assert_eq!(
        state.last_assistant_message().unwrap().tool_calls[0].name,
        "lookup"
    );

    state.push_message(Message::assistant("answer: y"));
    assert!(!state.has_pending_tool_calls());
}

#[test]
fn into_fields_yields_final_state() {
    let mut state = StateContainer::new(&schema());
    state.apply("status", json!("done")).unwrap();
    let fields = state.into_fields();
    assert_eq!(fields.get("status"), Some(&json!("done")));
}
