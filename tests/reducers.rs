//! Reducer semantics: replace overwrites, append preserves element
//! boundaries and order, merge-messages preserves chronology without dedup.

use serde_json::{Value, json};
use std::sync::Arc;

use weftrun::definition::ReducerKind;
use weftrun::message::Message;
use weftrun::reducers::{Append, MergeMessages, Reducer, ReducerRegistry, Replace};

#[test]
fn replace_overwrites() {
    let reducer = Replace;
    let mut current = json!("old");
    reducer.apply(&mut current, json!("new"));
    assert_eq!(current, json!("new"));

    reducer.apply(&mut current, json!(null));
    assert_eq!(current, json!(null));
}

#[test]
fn append_preserves_order_and_boundaries() {
    let reducer = Append;
    let mut current = json!([]);
    reducer.apply(&mut current, json!(["a"]));
    reducer.apply(&mut current, json!(["b"]));
    // Never ["b", "a"], never a scalar concatenation.
    assert_eq!(current, json!(["a", "b"]));
}

#[test]
fn append_pushes_scalars_as_elements() {
    let reducer = Append;
    let mut current = Value::Null;
    reducer.apply(&mut current, json!("first"));
    reducer.apply(&mut current, json!(["second", "third"]));
    assert_eq!(current, json!(["first", "second", "third"]));
}

#[test]
fn append_promotes_scalar_fields_to_sequences() {
    let reducer = Append;
    let mut current = json!("seed");
    reducer.apply(&mut current, json!("next"));
    assert_eq!(current, json!(["seed", "next"]));
}

#[test]
fn merge_messages_keeps_chronology() {
    let reducer = MergeMessages;
    let mut current = json!([]);
    reducer.apply(&mut current, Message::user("one").to_value());
    reducer.apply(&mut current, Message::assistant("two").to_value());

    let items = current.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "one");
    assert_eq!(items[1]["content"], "two");
}

#[test]
fn merge_messages_never_deduplicates() {
    // Two branches may emit distinct messages with identical text; the
    // history reflects true chronology.
    let reducer = MergeMessages;
    let mut current = json!([]);
    let duplicate = Message::assistant("same text").to_value();
    reducer.apply(&mut current, duplicate.clone());
    reducer.apply(&mut current, duplicate);
    assert_eq!(current.as_array().unwrap().len(), 2);
}

#[test]
fn registry_dispatches_by_kind() {
    let registry = ReducerRegistry::default();

    let mut replaced = json!(1);
    registry
        .apply(ReducerKind::Replace, &mut replaced, json!(2))
        .unwrap();
    assert_eq!(replaced, json!(2));

    let mut appended = json!([1]);
    registry
        .apply(ReducerKind::Append, &mut appended, json!([2]))
        .unwrap();
    assert_eq!(appended, json!([1, 2]));
}

#[test]
fn registry_rejects_unregistered_kinds() {
    let registry = ReducerRegistry::new().with_reducer(ReducerKind::Replace, Arc::new(Replace));
    let mut current = Value::Null;
    assert!(
        registry
            .apply(ReducerKind::Append, &mut current, json!([1]))
            .is_err()
    );
}
