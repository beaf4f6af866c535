//! Structural validation of graph definitions.
//!
//! Validation never mutates the definition and reports findings as
//! human-readable strings: [`validate`] returns hard errors that block
//! execution, [`lint`] returns advisory findings (fields referenced but not
//! declared in the state schema).

use rustc_hash::FxHashSet;

use super::{EdgeCondition, GraphDefinition, NodeConfig};
use crate::types::NodeRef;

/// Validate a graph definition, returning a list of errors.
///
/// An empty list means the definition is valid. A definition with zero nodes
/// is valid (an un-built graph) but cannot be executed. Checks, in order:
///
/// 1. the entry point references an existing node (or is empty for an empty
///    graph),
/// 2. every edge endpoint references an existing node or a `START`/`END`
///    sentinel,
/// 3. node ids are unique,
/// 4. each node's type-specific config is structurally consistent.
#[must_use]
pub fn validate(def: &GraphDefinition) -> Vec<String> {
    let mut errors = Vec::new();
    let node_ids: FxHashSet<&str> = def.nodes.iter().map(|n| n.id.as_str()).collect();

    if def.nodes.is_empty() {
        if !def.entry_point.is_empty() {
            errors.push(format!(
                "entry point '{}' declared but the graph has no nodes",
                def.entry_point
            ));
        }
    } else if def.entry_point.is_empty() {
        errors.push("entry point is required for a non-empty graph".to_string());
    } else if !node_ids.contains(def.entry_point.as_str()) {
        errors.push(format!(
            "entry point '{}' does not reference a node in the graph",
            def.entry_point
        ));
    }

    for (index, edge) in def.edges.iter().enumerate() {
        for (side, endpoint) in [("from_node", &edge.from_node), ("to_node", &edge.to_node)] {
            if let NodeRef::Node(id) = NodeRef::parse(endpoint)
                && !node_ids.contains(id.as_str())
            {
                errors.push(format!(
                    "edge #{index} {side} '{endpoint}' does not reference a node or START/END"
                ));
            }
        }
    }

    let mut seen = FxHashSet::default();
    for node in &def.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(format!("duplicate node id '{}'", node.id));
        }
    }

    for node in &def.nodes {
        validate_node_config(node.id.as_str(), &node.config, &mut errors);
    }

    errors
}

fn validate_node_config(id: &str, config: &NodeConfig, errors: &mut Vec<String>) {
    match config {
        NodeConfig::Llm(c) => {
            if c.prompt_template.is_empty() {
                errors.push(format!("llm node '{id}' has an empty prompt_template"));
            }
            if c.output_key.is_empty() {
                errors.push(format!("llm node '{id}' has an empty output_key"));
            }
            if c.max_iterations == 0 {
                errors.push(format!("llm node '{id}' has max_iterations of 0"));
            }
        }
        NodeConfig::Tool(c) => {
            if c.output_key.is_empty() {
                errors.push(format!("tool node '{id}' has an empty output_key"));
            }
            if c.execute_all && !c.tool_filter.is_empty() {
                errors.push(format!(
                    "tool node '{id}' sets execute_all but also lists a tool filter"
                ));
            }
            if !c.execute_all && c.tool_filter.is_empty() {
                errors.push(format!(
                    "tool node '{id}' has no tool filter and does not set execute_all"
                ));
            }
        }
        NodeConfig::Transform(c) => {
            if c.output_key.is_empty() {
                errors.push(format!("transform node '{id}' has an empty output_key"));
            }
        }
    }
}

/// Advisory findings that do not block execution.
///
/// Every field referenced by a node's `output_key` or by a custom edge
/// condition's `state_key` should exist in the state schema; fields written
/// outside the schema fall back to replace semantics.
#[must_use]
pub fn lint(def: &GraphDefinition) -> Vec<String> {
    let mut warnings = Vec::new();

    for node in &def.nodes {
        let key = node.output_key();
        if !key.is_empty() && !def.state_schema.contains_key(key) {
            warnings.push(format!(
                "node '{}' writes output_key '{key}' which is not declared in the state schema",
                node.id
            ));
        }
    }

    for (index, edge) in def.edges.iter().enumerate() {
        if let Some(EdgeCondition::Custom(custom)) = &edge.condition
            && !def.state_schema.contains_key(custom.state_key.as_str())
        {
            warnings.push(format!(
                "edge #{index} condition reads state_key '{}' which is not declared in the state schema",
                custom.state_key
            ));
        }
    }

    warnings
}
