//! Migration of stored graph definitions to the current schema.
//!
//! `"2.0"` documents pass through unchanged, which makes migration
//! idempotent. `"1.0"` documents are translated field-by-field; an empty or
//! untranslatable legacy document becomes the default reason/act template
//! instead of an empty graph - a deliberate ergonomic default, recorded
//! under `metadata.migration` so the substitution is visible downstream.

use miette::Diagnostic;
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::{
    BuiltinCondition, CURRENT_VERSION, ConditionOp, CustomCondition, DEFAULT_MAX_ITERATIONS, Edge,
    EdgeCondition, GraphDefinition, LEGACY_VERSION, LlmConfig, NodeConfig, NodeSpec, ReducerKind,
    StateFieldSchema, StateSchema, ToolConfig, TransformConfig,
};
use crate::types::{END, START};

/// Legacy wildcard marker meaning "all tools".
const WILDCARD_TOOL_TARGET: &str = "*";

/// Errors raised while migrating a stored definition.
#[derive(Debug, Error, Diagnostic)]
pub enum MigrationError {
    #[error("definition is not a JSON object")]
    #[diagnostic(
        code(weftrun::definition::not_an_object),
        help("Stored definitions must be JSON objects with a 'version' field.")
    )]
    NotAnObject,

    #[error("unsupported schema version: {0}")]
    #[diagnostic(
        code(weftrun::definition::unsupported_version),
        help("Supported versions are '1.0' (migrated) and '2.0' (current).")
    )]
    UnsupportedVersion(String),

    #[error(transparent)]
    #[diagnostic(code(weftrun::definition::serde))]
    Serde(#[from] serde_json::Error),
}

/// Returns true when the raw document already carries the current schema tag.
#[must_use]
pub fn is_current(raw: &Value) -> bool {
    raw.get("version").and_then(Value::as_str) == Some(CURRENT_VERSION)
}

/// Upgrade a stored definition to the current schema.
///
/// Already-current documents deserialize unchanged. Legacy documents are
/// translated; when the legacy structure is empty or ambiguous the default
/// template is substituted and the substitution recorded in metadata.
pub fn migrate(raw: Value) -> Result<GraphDefinition, MigrationError> {
    let Some(obj) = raw.as_object() else {
        return Err(MigrationError::NotAnObject);
    };

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or(LEGACY_VERSION);
    match version {
        CURRENT_VERSION => Ok(serde_json::from_value(raw.clone())?),
        LEGACY_VERSION => Ok(migrate_legacy(obj)),
        other => Err(MigrationError::UnsupportedVersion(other.to_string())),
    }
}

/// The fixed two-node reason/act template substituted for empty legacy
/// definitions: a model-call node unconditionally followed by a
/// tool-execution node, with a conditional loop back from tool to model and
/// a conditional exit to `END`.
#[must_use]
pub fn default_template() -> GraphDefinition {
    let mut state_schema = StateSchema::default();
    state_schema.insert("messages".to_string(), StateFieldSchema::messages());

    GraphDefinition {
        version: CURRENT_VERSION.to_string(),
        entry_point: "reason".to_string(),
        nodes: vec![
            NodeSpec::llm("reason", "Reason", "{input}", "messages"),
            NodeSpec::tool_all("act", "Act", "messages"),
        ],
        edges: vec![
            Edge::new(START, "reason"),
            Edge::new("reason", "act"),
            Edge::new("act", "reason")
                .with_condition(EdgeCondition::Builtin(BuiltinCondition::HasToolCalls))
                .with_label("loop"),
            Edge::new("act", END)
                .with_condition(EdgeCondition::Builtin(BuiltinCondition::NoToolCalls))
                .with_label("done"),
        ],
        state_schema,
        metadata: Some(json!({"name": "reason-act"})),
        max_execution_time_seconds: None,
        enable_checkpoints: false,
    }
}

fn fallback_with_reason(reason: &str) -> GraphDefinition {
    let mut def = default_template();
    let mut metadata = def
        .metadata
        .take()
        .and_then(|m| m.as_object().cloned())
        .unwrap_or_default();
    metadata.insert(
        "migration".to_string(),
        json!({"fallback": "default-template", "reason": reason}),
    );
    def.metadata = Some(Value::Object(metadata));
    def
}

fn migrate_legacy(obj: &Map<String, Value>) -> GraphDefinition {
    let legacy_nodes = obj
        .get("nodes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if legacy_nodes.is_empty() {
        return fallback_with_reason("empty legacy definition");
    }

    let mut nodes = Vec::with_capacity(legacy_nodes.len());
    for (index, raw_node) in legacy_nodes.iter().enumerate() {
        match migrate_node(index, raw_node) {
            Ok(node) => nodes.push(node),
            Err(reason) => {
                tracing::warn!(reason, "legacy definition is ambiguous, substituting default");
                return fallback_with_reason(&reason);
            }
        }
    }

    let legacy_edges = obj
        .get("edges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut edges = Vec::with_capacity(legacy_edges.len());
    for (index, raw_edge) in legacy_edges.iter().enumerate() {
        match migrate_edge(index, raw_edge) {
            Ok(edge) => edges.push(edge),
            Err(reason) => {
                tracing::warn!(reason, "legacy definition is ambiguous, substituting default");
                return fallback_with_reason(&reason);
            }
        }
    }

    let entry_point = obj
        .get("entry_point")
        .or_else(|| obj.get("entry"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| nodes[0].id.clone());

    let mut metadata = obj
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    metadata.insert("migration".to_string(), json!({"from": LEGACY_VERSION}));

    GraphDefinition {
        version: CURRENT_VERSION.to_string(),
        entry_point,
        nodes,
        edges,
        state_schema: migrate_state_schema(obj),
        metadata: Some(Value::Object(metadata)),
        max_execution_time_seconds: obj
            .get("max_execution_time_seconds")
            .and_then(Value::as_u64),
        enable_checkpoints: obj
            .get("enable_checkpoints")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn migrate_node(index: usize, raw: &Value) -> Result<NodeSpec, String> {
    let Some(obj) = raw.as_object() else {
        return Err(format!("legacy node #{index} is not an object"));
    };
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{index}"));
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    let config_obj = obj
        .get("config")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let node_type = obj.get("type").and_then(Value::as_str).unwrap_or("");
    let config = match node_type {
        "llm" | "agent" | "model" => NodeConfig::Llm(migrate_llm_config(&config_obj)),
        "tool" | "tools" => NodeConfig::Tool(migrate_tool_config(&config_obj)),
        "transform" => NodeConfig::Transform(migrate_transform_config(&config_obj)),
        other => {
            return Err(format!("legacy node '{id}' has unknown type '{other}'"));
        }
    };

    Ok(NodeSpec { id, name, config })
}

fn migrate_llm_config(config: &Map<String, Value>) -> LlmConfig {
    let prompt_template = config
        .get("prompt_template")
        .or_else(|| config.get("prompt"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("{input}")
        .to_string();
    let max_iterations = config
        .get("max_iterations")
        .or_else(|| config.get("loop_limit"))
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_ITERATIONS);
    LlmConfig {
        prompt_template,
        output_key: migrate_output_key(config, "messages"),
        max_iterations,
    }
}

/// A legacy tool target of `"*"` (or a missing target) means "all tools" and
/// becomes the explicit `execute_all` flag rather than a literal filter.
fn migrate_tool_config(config: &Map<String, Value>) -> ToolConfig {
    let target = config
        .get("tool")
        .or_else(|| config.get("target"))
        .or_else(|| config.get("tools"));

    let (tool_filter, execute_all) = match target {
        None | Some(Value::Null) => (Vec::new(), true),
        Some(Value::String(s)) if s == WILDCARD_TOOL_TARGET => (Vec::new(), true),
        Some(Value::String(s)) => (vec![s.clone()], false),
        Some(Value::Array(items)) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            if names.iter().any(|n| n == WILDCARD_TOOL_TARGET) {
                (Vec::new(), true)
            } else {
                (names, false)
            }
        }
        Some(_) => (Vec::new(), true),
    };

    ToolConfig {
        tool_filter,
        execute_all,
        output_key: migrate_output_key(config, "messages"),
    }
}

fn migrate_transform_config(config: &Map<String, Value>) -> TransformConfig {
    TransformConfig {
        input_key: config
            .get("input_key")
            .and_then(Value::as_str)
            .map(str::to_string),
        output_key: migrate_output_key(config, "output"),
        params: config.get("params").cloned().unwrap_or(Value::Null),
    }
}

fn migrate_output_key(config: &Map<String, Value>, fallback: &str) -> String {
    config
        .get("output_key")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn migrate_edge(index: usize, raw: &Value) -> Result<Edge, String> {
    let Some(obj) = raw.as_object() else {
        return Err(format!("legacy edge #{index} is not an object"));
    };
    let from_node = obj
        .get("from_node")
        .or_else(|| obj.get("source"))
        .or_else(|| obj.get("from"))
        .and_then(Value::as_str)
        .ok_or_else(|| format!("legacy edge #{index} has no source"))?
        .to_string();
    let mut to_node = obj
        .get("to_node")
        .or_else(|| obj.get("target"))
        .or_else(|| obj.get("to"))
        .and_then(Value::as_str)
        .ok_or_else(|| format!("legacy edge #{index} has no target"))?
        .to_string();

    let condition = match obj.get("condition") {
        None | Some(Value::Null) => None,
        Some(raw_condition) => Some(migrate_condition(index, raw_condition, &mut to_node)?),
    };

    Ok(Edge {
        from_node,
        to_node,
        condition,
        priority: obj
            .get("priority")
            .and_then(Value::as_i64)
            .map(|p| p as i32),
        label: obj
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn migrate_condition(
    index: usize,
    raw: &Value,
    to_node: &mut String,
) -> Result<EdgeCondition, String> {
    match raw {
        Value::String(tag) => match tag.as_str() {
            "has-tool-calls" | "has_tool_calls" => {
                Ok(EdgeCondition::Builtin(BuiltinCondition::HasToolCalls))
            }
            "no-tool-calls" | "no_tool_calls" => {
                Ok(EdgeCondition::Builtin(BuiltinCondition::NoToolCalls))
            }
            other => Err(format!(
                "legacy edge #{index} has unknown condition tag '{other}'"
            )),
        },
        Value::Object(obj) => {
            let state_key = obj
                .get("state_key")
                .or_else(|| obj.get("key"))
                .and_then(Value::as_str)
                .ok_or_else(|| format!("legacy edge #{index} condition has no state_key"))?
                .to_string();
            let operator = obj
                .get("operator")
                .or_else(|| obj.get("op"))
                .and_then(Value::as_str)
                .ok_or_else(|| format!("legacy edge #{index} condition has no operator"))?;
            let operator = migrate_operator(operator)
                .ok_or_else(|| format!("legacy edge #{index} has unknown operator '{operator}'"))?;
            // Legacy conditions could carry their own routing target; fold it
            // into the edge destination.
            if let Some(target) = obj.get("target").and_then(Value::as_str) {
                *to_node = target.to_string();
            }
            Ok(EdgeCondition::Custom(CustomCondition {
                state_key,
                operator,
                value: obj.get("value").cloned().unwrap_or(Value::Null),
            }))
        }
        _ => Err(format!("legacy edge #{index} condition is malformed")),
    }
}

fn migrate_operator(raw: &str) -> Option<ConditionOp> {
    match raw {
        "equals" | "eq" => Some(ConditionOp::Equals),
        "not_equals" | "not-equals" | "neq" => Some(ConditionOp::NotEquals),
        "truthy" => Some(ConditionOp::Truthy),
        "falsy" => Some(ConditionOp::Falsy),
        "contains" => Some(ConditionOp::Contains),
        "greater_than" | "greater-than" | "gt" => Some(ConditionOp::GreaterThan),
        "less_than" | "less-than" | "lt" => Some(ConditionOp::LessThan),
        _ => None,
    }
}

fn migrate_state_schema(obj: &Map<String, Value>) -> StateSchema {
    let mut schema = StateSchema::default();
    let legacy_schema = obj
        .get("state_schema")
        .or_else(|| obj.get("state"))
        .and_then(Value::as_object);
    let Some(legacy_schema) = legacy_schema else {
        return schema;
    };

    for (field, raw_field) in legacy_schema {
        let field_obj = raw_field.as_object();
        let reducer = field_obj
            .and_then(|o| o.get("reducer"))
            .and_then(Value::as_str)
            .map(migrate_reducer)
            .unwrap_or_default();
        let default = field_obj
            .and_then(|o| o.get("default"))
            .cloned()
            .unwrap_or(Value::Null);
        let field_type = field_obj
            .and_then(|o| o.get("type"))
            .and_then(Value::as_str)
            .and_then(|t| serde_json::from_value(Value::String(t.to_string())).ok())
            .unwrap_or_default();
        schema.insert(
            field.clone(),
            StateFieldSchema {
                field_type,
                default,
                reducer,
            },
        );
    }
    schema
}

fn migrate_reducer(raw: &str) -> ReducerKind {
    match raw {
        "append" | "add" => ReducerKind::Append,
        "merge-messages" | "merge_messages" | "add_messages" => ReducerKind::MergeMessages,
        _ => ReducerKind::Replace,
    }
}
