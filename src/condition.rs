//! Edge condition evaluation and routing.
//!
//! The [`ConditionEvaluator`] decides which outgoing edges fire when a node
//! completes. Conditional edges win over unconditional ones: if any
//! conditional edge is satisfied, exactly one is selected (higher `priority`
//! first, then declaration order). If no conditional edge matches, every
//! unconditional edge fires, which is how parallel fan-out is expressed. If
//! the node has no applicable edges the branch terminates at `END`.
//!
//! Built-in condition tags evaluate over the most recent model response
//! stored in the conversation history; custom conditions evaluate
//! `operator(state[state_key], value)`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::definition::{BuiltinCondition, ConditionOp, CustomCondition, Edge, EdgeCondition};
use crate::state::StateContainer;
use crate::utils::json_ext;

/// Selects successor nodes for the execution engine.
pub struct ConditionEvaluator<'a> {
    edges: &'a [Edge],
}

impl<'a> ConditionEvaluator<'a> {
    #[must_use]
    pub fn new(edges: &'a [Edge]) -> Self {
        Self { edges }
    }

    /// Targets that fire when `current_node` completes.
    ///
    /// The returned ids may include the `END` sentinel; an empty vector also
    /// terminates the branch.
    #[must_use]
    pub fn select_next(&self, current_node: &str, state: &StateContainer) -> Vec<String> {
        let outgoing: Vec<(usize, &Edge)> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.from_node == current_node)
            .collect();

        let mut matching: Vec<(usize, &Edge)> = Vec::new();
        for (index, edge) in &outgoing {
            if let Some(condition) = &edge.condition
                && evaluate(condition, state)
            {
                matching.push((*index, edge));
            }
        }

        if !matching.is_empty() {
            // Higher priority first, declaration order breaks ties.
            matching.sort_by(|(ai, a), (bi, b)| {
                let ap = a.priority.unwrap_or(0);
                let bp = b.priority.unwrap_or(0);
                match bp.cmp(&ap) {
                    Ordering::Equal => ai.cmp(bi),
                    other => other,
                }
            });
            let (_, winner) = matching[0];
            tracing::debug!(
                from = current_node,
                to = %winner.to_node,
                "conditional edge selected"
            );
            return vec![winner.to_node.clone()];
        }

        outgoing
            .iter()
            .filter(|(_, e)| e.condition.is_none())
            .map(|(_, e)| e.to_node.clone())
            .collect()
    }
}

/// Evaluate one edge condition against the current state.
#[must_use]
pub fn evaluate(condition: &EdgeCondition, state: &StateContainer) -> bool {
    match condition {
        EdgeCondition::Builtin(BuiltinCondition::HasToolCalls) => state.has_pending_tool_calls(),
        EdgeCondition::Builtin(BuiltinCondition::NoToolCalls) => !state.has_pending_tool_calls(),
        EdgeCondition::Custom(custom) => evaluate_custom(custom, state),
    }
}

fn evaluate_custom(condition: &CustomCondition, state: &StateContainer) -> bool {
    let actual = state
        .get(&condition.state_key)
        .cloned()
        .unwrap_or(Value::Null);
    match condition.operator {
        ConditionOp::Equals => actual == condition.value,
        ConditionOp::NotEquals => actual != condition.value,
        ConditionOp::Truthy => json_ext::is_truthy(&actual),
        ConditionOp::Falsy => !json_ext::is_truthy(&actual),
        ConditionOp::Contains => json_ext::contains(&actual, &condition.value),
        ConditionOp::GreaterThan => {
            json_ext::compare_numbers(&actual, &condition.value) == Some(Ordering::Greater)
        }
        ConditionOp::LessThan => {
            json_ext::compare_numbers(&actual, &condition.value) == Some(Ordering::Less)
        }
    }
}
