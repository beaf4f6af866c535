//! State management for workflow execution.
//!
//! A [`StateContainer`] holds the live state of exactly one run. It is
//! seeded from the state schema's field defaults and mutated only through
//! the reducer contract - never by direct external assignment - which is
//! what preserves the ordering guarantees of `append` and `merge-messages`
//! fields. Reads go through [`StateContainer::snapshot`], which returns a
//! consistent point-in-time view; no read ever observes a partially-applied
//! reducer.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use weftrun::definition::{StateFieldSchema, StateSchema};
//! use weftrun::message::Message;
//! use weftrun::state::StateContainer;
//!
//! let mut schema = StateSchema::default();
//! schema.insert("messages".to_string(), StateFieldSchema::messages());
//! schema.insert("findings".to_string(), StateFieldSchema::list());
//!
//! let mut state = StateContainer::new(&schema);
//! state.push_message(Message::user("hello"));
//! state.apply("findings", json!(["first"])).unwrap();
//! state.apply("findings", json!(["second"])).unwrap();
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.get("findings"), Some(&json!(["first", "second"])));
//! assert_eq!(snapshot.messages().len(), 1);
//! ```

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::definition::{ReducerKind, StateSchema};
use crate::message::Message;
use crate::reducers::{ReducerError, ReducerRegistry};

/// Conventional field name holding the conversation history. Built-in edge
/// conditions inspect the most recent assistant message stored here.
pub const MESSAGES_FIELD: &str = "messages";

/// The live, exclusively-owned state of one workflow run.
pub struct StateContainer {
    schema: StateSchema,
    fields: FxHashMap<String, Value>,
    reducers: ReducerRegistry,
}

impl StateContainer {
    /// Create a container seeded from each schema field's default.
    #[must_use]
    pub fn new(schema: &StateSchema) -> Self {
        Self::with_reducers(schema, ReducerRegistry::default())
    }

    /// Create a container with a custom reducer registry.
    #[must_use]
    pub fn with_reducers(schema: &StateSchema, reducers: ReducerRegistry) -> Self {
        let mut fields = FxHashMap::default();
        for (name, field) in schema {
            fields.insert(name.clone(), field.default.clone());
        }
        Self {
            schema: schema.clone(),
            fields,
            reducers,
        }
    }

    /// Fold an incoming value into a field through its schema reducer.
    ///
    /// Fields not present in the schema start from an untyped empty value on
    /// first write and use replace semantics.
    pub fn apply(&mut self, field: &str, incoming: Value) -> Result<(), ReducerError> {
        let kind = self
            .schema
            .get(field)
            .map(|f| f.reducer)
            .unwrap_or(ReducerKind::Replace);
        self.apply_with(kind, field, incoming)
    }

    /// Fold an incoming value into a field with an explicit reducer kind,
    /// bypassing the schema lookup.
    pub fn apply_with(
        &mut self,
        kind: ReducerKind,
        field: &str,
        incoming: Value,
    ) -> Result<(), ReducerError> {
        let slot = self
            .fields
            .entry(field.to_string())
            .or_insert(Value::Null);
        self.reducers.apply(kind, slot, incoming)
    }

    /// Append a message to the conversation history with `merge-messages`
    /// semantics, regardless of whether the schema declares the field.
    pub fn push_message(&mut self, message: Message) {
        // The default registry always carries MergeMessages.
        let _ = self.apply_with(ReducerKind::MergeMessages, MESSAGES_FIELD, message.to_value());
    }

    /// Read a field's current value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The reducer kind governing a field (replace for undeclared fields).
    #[must_use]
    pub fn reducer_for(&self, field: &str) -> ReducerKind {
        self.schema
            .get(field)
            .map(|f| f.reducer)
            .unwrap_or(ReducerKind::Replace)
    }

    /// Consistent point-in-time view of all fields.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            fields: self.fields.clone(),
        }
    }

    /// Consume the container, yielding the final field map.
    #[must_use]
    pub fn into_fields(self) -> FxHashMap<String, Value> {
        self.fields
    }

    /// The most recent assistant message in the conversation history.
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<Message> {
        last_assistant_in(self.fields.get(MESSAGES_FIELD))
    }

    /// True iff the most recent model response requested at least one tool
    /// call.
    #[must_use]
    pub fn has_pending_tool_calls(&self) -> bool {
        self.last_assistant_message()
            .map(|m| m.has_tool_calls())
            .unwrap_or(false)
    }
}

/// Immutable snapshot of run state at a specific point in time.
///
/// Snapshots are handed to node executors; they are independent of the
/// container and safe to use while the run continues.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StateSnapshot {
    pub fields: FxHashMap<String, Value>,
}

impl StateSnapshot {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The conversation history, empty if the field is absent or not a list.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.fields
            .get(MESSAGES_FIELD)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Message::from_value).collect())
            .unwrap_or_default()
    }

    /// The most recent assistant message in the conversation history.
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<Message> {
        last_assistant_in(self.fields.get(MESSAGES_FIELD))
    }
}

fn last_assistant_in(field: Option<&Value>) -> Option<Message> {
    field
        .and_then(Value::as_array)?
        .iter()
        .rev()
        .filter_map(Message::from_value)
        .find(|m| m.has_role(Message::ASSISTANT))
}
