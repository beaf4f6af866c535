//! Graph definition model for workflow execution.
//!
//! This module defines the serde-backed document format that describes an
//! agent workflow: nodes with type-specific configs, edges with optional
//! conditions, and the state schema that governs how node outputs are merged.
//! A definition is authored (or produced by the
//! [`registry`](crate::registry)), migrated if stale, validated, and then
//! handed to the [`ExecutionEngine`](crate::engine::ExecutionEngine) - at
//! which point it is immutable for the duration of a run.
//!
//! # Core Types
//!
//! - [`GraphDefinition`]: The whole document (`version` selects migration)
//! - [`NodeSpec`] / [`NodeConfig`]: A node and its type-tagged config payload
//! - [`Edge`] / [`EdgeCondition`]: Transitions, optionally guarded
//! - [`StateSchema`] / [`StateFieldSchema`]: Field defaults and reducers
//!
//! # Wire Format
//!
//! ```
//! use weftrun::definition::{GraphDefinition, NodeConfig};
//!
//! let json = r#"{
//!     "version": "2.0",
//!     "entry_point": "reason",
//!     "nodes": [
//!         {
//!             "id": "reason",
//!             "name": "Reason",
//!             "type": "llm",
//!             "config": {
//!                 "prompt_template": "{input}",
//!                 "output_key": "messages",
//!                 "max_iterations": 4
//!             }
//!         }
//!     ],
//!     "edges": [
//!         {"from_node": "reason", "to_node": "END", "condition": "no-tool-calls"}
//!     ],
//!     "state_schema": {
//!         "messages": {"type": "messages", "default": [], "reducer": "merge-messages"}
//!     }
//! }"#;
//!
//! let def: GraphDefinition = serde_json::from_str(json).unwrap();
//! assert!(matches!(def.nodes[0].config, NodeConfig::Llm(_)));
//! ```

mod migrator;
mod validator;

pub use migrator::{MigrationError, default_template, is_current, migrate};
pub use validator::{lint, validate};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current graph schema version; documents with this tag pass through the
/// migrator unchanged.
pub const CURRENT_VERSION: &str = "2.0";
/// Legacy schema version upgraded field-by-field by the migrator.
pub const LEGACY_VERSION: &str = "1.0";

/// Default iteration cap applied to model-call nodes that omit one.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// A complete workflow graph document.
///
/// Immutable once handed to the engine for a run. `entry_point` must name an
/// existing node unless the graph is empty; edge endpoints must name nodes or
/// the `START`/`END` sentinels (see [`validate`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Schema tag; selects migrator behavior.
    pub version: String,
    /// Node id where execution starts. Empty only for empty graphs.
    #[serde(default)]
    pub entry_point: String,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub state_schema: StateSchema,
    /// Free-form document metadata (name, description, migration notes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Run-level deadline; the engine config supplies a default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_time_seconds: Option<u64>,
    /// When set, the engine saves a run summary after every step.
    #[serde(default)]
    pub enable_checkpoints: bool,
}

impl GraphDefinition {
    /// A current-version definition with no nodes. Valid, but not executable.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            entry_point: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            state_schema: StateSchema::default(),
            metadata: None,
            max_execution_time_seconds: None,
            enable_checkpoints: false,
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns true when the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Human-readable name from metadata, falling back to the entry point.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if self.entry_point.is_empty() {
                    "agent".to_string()
                } else {
                    self.entry_point.clone()
                }
            })
    }
}

/// A single unit of work in the graph.
///
/// The `type`/`config` pair is modeled as a tagged union so a config payload
/// that does not match its declared type is unrepresentable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique id within the graph.
    pub id: String,
    /// Human-readable name used in execution paths and summaries.
    pub name: String,
    #[serde(flatten)]
    pub config: NodeConfig,
}

impl NodeSpec {
    /// A model-call node with the default iteration cap.
    #[must_use]
    pub fn llm(id: &str, name: &str, prompt_template: &str, output_key: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            config: NodeConfig::Llm(LlmConfig {
                prompt_template: prompt_template.to_string(),
                output_key: output_key.to_string(),
                max_iterations: DEFAULT_MAX_ITERATIONS,
            }),
        }
    }

    /// A tool-invocation node restricted to the given tools.
    #[must_use]
    pub fn tool(id: &str, name: &str, tool_filter: Vec<String>, output_key: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            config: NodeConfig::Tool(ToolConfig {
                tool_filter,
                execute_all: false,
                output_key: output_key.to_string(),
            }),
        }
    }

    /// A tool-invocation node that executes every requested tool call.
    #[must_use]
    pub fn tool_all(id: &str, name: &str, output_key: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            config: NodeConfig::Tool(ToolConfig {
                tool_filter: Vec::new(),
                execute_all: true,
                output_key: output_key.to_string(),
            }),
        }
    }

    /// A pure data-transform node.
    #[must_use]
    pub fn transform(id: &str, name: &str, output_key: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            config: NodeConfig::Transform(TransformConfig {
                input_key: None,
                output_key: output_key.to_string(),
                params: Value::Null,
            }),
        }
    }

    /// The node's type tag (`llm`, `tool`, or `transform`).
    #[must_use]
    pub fn node_type(&self) -> &'static str {
        self.config.type_name()
    }

    /// The state field this node's output is reduced into.
    #[must_use]
    pub fn output_key(&self) -> &str {
        self.config.output_key()
    }
}

/// Type-specific node configuration, tagged by the node `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum NodeConfig {
    /// Model-call node.
    Llm(LlmConfig),
    /// Tool-invocation node.
    Tool(ToolConfig),
    /// Pure data transform.
    Transform(TransformConfig),
}

impl NodeConfig {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeConfig::Llm(_) => "llm",
            NodeConfig::Tool(_) => "tool",
            NodeConfig::Transform(_) => "transform",
        }
    }

    #[must_use]
    pub fn output_key(&self) -> &str {
        match self {
            NodeConfig::Llm(c) => &c.output_key,
            NodeConfig::Tool(c) => &c.output_key,
            NodeConfig::Transform(c) => &c.output_key,
        }
    }
}

/// Configuration for a model-call node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Prompt template rendered against the state snapshot by the executor.
    pub prompt_template: String,
    /// State field the response is reduced into.
    pub output_key: String,
    /// Cap on how often this node may execute within one run. Bounds
    /// supervisor-style repeat loops.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

/// Configuration for a tool-invocation node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool names this node may invoke. Ignored when `execute_all` is set.
    #[serde(default)]
    pub tool_filter: Vec<String>,
    /// Execute every tool call requested by the most recent model response.
    #[serde(default)]
    pub execute_all: bool,
    /// State field the tool results are reduced into.
    pub output_key: String,
}

/// Configuration for a pure transform node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Optional state field the transform reads; executors may read the whole
    /// snapshot instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_key: Option<String>,
    /// State field the result is reduced into.
    pub output_key: String,
    /// Opaque parameters interpreted by the executor.
    #[serde(default)]
    pub params: Value,
}

/// A directed transition between nodes, optionally guarded by a condition.
///
/// Multiple unconditional edges from one node fan out; multiple conditional
/// edges branch, disambiguated by `priority` (higher first) then declaration
/// order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source: node id or the `START` sentinel.
    pub from_node: String,
    /// Target: node id or the `END` sentinel.
    pub to_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EdgeCondition>,
    /// Higher priorities are evaluated first among matching conditionals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    /// An unconditional edge.
    #[must_use]
    pub fn new(from_node: &str, to_node: &str) -> Self {
        Self {
            from_node: from_node.to_string(),
            to_node: to_node.to_string(),
            condition: None,
            priority: None,
            label: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: EdgeCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// Guard on an edge: either a built-in tag or a custom state predicate.
///
/// An edge carries exactly one condition form; the enum makes carrying both
/// simultaneously unrepresentable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeCondition {
    /// Built-in tag evaluated over the most recent model response.
    Builtin(BuiltinCondition),
    /// Custom predicate `operator(state[state_key], value)`.
    Custom(CustomCondition),
}

/// Built-in condition tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinCondition {
    /// True iff the last model response requested at least one tool call.
    HasToolCalls,
    /// True iff the last model response requested no tool calls.
    NoToolCalls,
}

/// A custom predicate over one state field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomCondition {
    /// State field to test.
    pub state_key: String,
    pub operator: ConditionOp,
    /// Right-hand operand; ignored by `truthy`/`falsy`.
    #[serde(default)]
    pub value: Value,
}

/// Operators available to custom conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOp {
    Equals,
    NotEquals,
    Truthy,
    Falsy,
    Contains,
    GreaterThan,
    LessThan,
}

/// Mapping from state field name to its schema.
pub type StateSchema = FxHashMap<String, StateFieldSchema>;

/// Schema for one state field: declared shape, seed default, and the reducer
/// applied when node outputs are written into it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct StateFieldSchema {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub reducer: ReducerKind,
}

impl StateFieldSchema {
    /// A message-history field merged with `merge-messages`.
    #[must_use]
    pub fn messages() -> Self {
        Self {
            field_type: FieldType::Messages,
            default: Value::Array(Vec::new()),
            reducer: ReducerKind::MergeMessages,
        }
    }

    /// An ordered sequence field merged with `append`.
    #[must_use]
    pub fn list() -> Self {
        Self {
            field_type: FieldType::List,
            default: Value::Array(Vec::new()),
            reducer: ReducerKind::Append,
        }
    }

    /// A scalar field overwritten with `replace`.
    #[must_use]
    pub fn value() -> Self {
        Self::default()
    }

    /// A `replace` field seeded with the given default.
    #[must_use]
    pub fn value_with_default(default: Value) -> Self {
        Self {
            field_type: FieldType::Value,
            default,
            reducer: ReducerKind::Replace,
        }
    }
}

/// Declared shape of a state field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    Value,
    List,
    Messages,
}

/// Merge strategy applied when a node output is written into a state field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReducerKind {
    /// Overwrite the current value.
    #[default]
    Replace,
    /// Concatenate onto an ordered sequence.
    Append,
    /// Append to a message history, preserving chronology, never
    /// deduplicating.
    MergeMessages,
}
