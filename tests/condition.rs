//! Routing semantics: conditional selection, priority tie-breaks, fan-out.

use serde_json::json;

use weftrun::condition::ConditionEvaluator;
use weftrun::definition::{
    BuiltinCondition, ConditionOp, CustomCondition, Edge, EdgeCondition, StateFieldSchema,
    StateSchema,
};
use weftrun::message::{Message, ToolCall};
use weftrun::state::{MESSAGES_FIELD, StateContainer};
use weftrun::types::END;

fn state() -> StateContainer {
    let mut schema = StateSchema::default();
    schema.insert(MESSAGES_FIELD.to_string(), StateFieldSchema::messages());
    schema.insert("flag".to_string(), StateFieldSchema::value());
    schema.insert("items".to_string(), StateFieldSchema::list());
    schema.insert("count".to_string(), StateFieldSchema::value());
    StateContainer::new(&schema)
}

fn truthy_edge(from: &str, to: &str, key: &str) -> Edge {
    Edge::new(from, to).with_condition(EdgeCondition::Custom(CustomCondition {
        state_key: key.to_string(),
        operator: ConditionOp::Truthy,
        value: json!(null),
    }))
}

#[test]
fn matching_conditional_edge_wins_over_unconditional() {
    let edges = vec![
        Edge::new("a", "fallback"),
        truthy_edge("a", "special", "flag"),
    ];
    let evaluator = ConditionEvaluator::new(&edges);

    let mut state = state();
    state.apply("flag", json!(true)).unwrap();
    assert_eq!(evaluator.select_next("a", &state), vec!["special"]);
}

#[test]
fn priority_breaks_ties_regardless_of_declaration_order() {
    // Declared low-priority first; the priority-2 edge must still win.
    let edges = vec![
        truthy_edge("a", "low", "flag").with_priority(1),
        truthy_edge("a", "high", "flag").with_priority(2),
    ];
    let evaluator = ConditionEvaluator::new(&edges);

    let mut state = state();
    state.apply("flag", json!(true)).unwrap();
    assert_eq!(evaluator.select_next("a", &state), vec!["high"]);

    // And the same with declaration order reversed.
    let edges = vec![
        truthy_edge("a", "high", "flag").with_priority(2),
        truthy_edge("a", "low", "flag").with_priority(1),
    ];
    let evaluator = ConditionEvaluator::new(&edges);
    assert_eq!(evaluator.select_next("a", &state), vec!["high"]);
}

#[test]
fn declaration_order_breaks_equal_priorities() {
    let edges = vec![
        truthy_edge("a", "first", "flag"),
        truthy_edge("a", "second", "flag"),
    ];
    let evaluator = ConditionEvaluator::new(&edges);

    let mut state = state();
    state.apply("flag", json!(true)).unwrap();
    assert_eq!(evaluator.select_next("a", &state), vec!["first"]);
}

#[test]
fn unconditional_edges_all_fire_when_no_conditional_matches() {
    let edges = vec![
        truthy_edge("a", "guarded", "flag"),
        Edge::new("a", "left"),
        Edge::new("a", "right"),
    ];
    let evaluator = ConditionEvaluator::new(&edges);

    // flag defaults to null: the guarded edge does not match, so the
    // unconditional pair fans out.
    let state = state();
    assert_eq!(evaluator.select_next("a", &state), vec!["left", "right"]);
}

#[test]
fn no_applicable_edges_terminates_the_branch() {
    let edges = vec![truthy_edge("a", "guarded", "flag")];
    let evaluator = ConditionEvaluator::new(&edges);
    let state = state();
    assert!(evaluator.select_next("a", &state).is_empty());

    // No outgoing edges at all.
    assert!(evaluator.select_next("isolated", &state).is_empty());
}

#[test]
fn end_targets_are_returned_verbatim() {
    let edges = vec![Edge::new("a", END)];
    let evaluator = ConditionEvaluator::new(&edges);
    assert_eq!(evaluator.select_next("a", &state()), vec![END.to_string()]);
}

#[test]
fn builtin_tags_follow_the_latest_model_response() {
    let edges = vec![
        Edge::new("act", "reason")
            .with_condition(EdgeCondition::Builtin(BuiltinCondition::HasToolCalls)),
        Edge::new("act", END)
            .with_condition(EdgeCondition::Builtin(BuiltinCondition::NoToolCalls)),
    ];
    let evaluator = ConditionEvaluator::new(&edges);

    let mut state = state();
    state.push_message(
        Message::assistant("searching").with_tool_calls(vec![ToolCall::new(
            "c1",
            "search",
            json!({}),
        )]),
    );
    assert_eq!(evaluator.select_next("act", &state), vec!["reason"]);

    state.push_message(Message::assistant("done"));
    assert_eq!(evaluator.select_next("act", &state), vec![END.to_string()]);
}

#[test]
fn custom_operators_evaluate_against_state() {
    let mut state = state();
    state.apply("flag", json!("ready")).unwrap();
    state.apply("items", json!(["x", "y"])).unwrap();
    state.apply("count", json!(5)).unwrap();

    let cases = vec![
        (ConditionOp::Equals, "flag", json!("ready"), true),
        (ConditionOp::Equals, "flag", json!("other"), false),
        (ConditionOp::NotEquals, "flag", json!("other"), true),
        (ConditionOp::Truthy, "items", json!(null), true),
        (ConditionOp::Falsy, "missing", json!(null), true),
        (ConditionOp::Contains, "items", json!("x"), true),
        (ConditionOp::Contains, "items", json!("z"), false),
        (ConditionOp::GreaterThan, "count", json!(3), true),
        (ConditionOp::GreaterThan, "count", json!(5), false),
        (ConditionOp::LessThan, "count", json!(10), true),
    ];

    for (operator, key, value, expected) in cases {
        let condition = EdgeCondition::Custom(CustomCondition {
            state_key: key.to_string(),
            operator,
            value: value.clone(),
        });
        assert_eq!(
            weftrun::condition::evaluate(&condition, &state),
            expected,
            "{operator:?} on '{key}' with {value}"
        );
    }
}
