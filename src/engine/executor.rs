//! The node-executor capability consumed by the engine.
//!
//! Model calls, tool invocations, and transforms are all performed by an
//! external [`NodeExecutor`]. The engine hands it the node spec, a
//! consistent state snapshot, and a [`NodeCtx`] for emitting progress
//! events; the executor returns an [`ExecutorOutput`] or an
//! [`ExecutorError`]. Retry policy, if any, belongs to the executor - the
//! engine never retries.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::definition::NodeSpec;
use crate::message::ToolCall;
use crate::state::StateSnapshot;
use crate::tracer::Tracer;

/// Result of executing one node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOutput {
    /// The value reduced into the node's output key.
    pub output: Value,
    /// Tool invocations requested by a model response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ExecutorOutput {
    /// An output with no tool calls.
    #[must_use]
    pub fn value(output: Value) -> Self {
        Self {
            output,
            tool_calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

/// Failure from the model/tool capability, caught at the step boundary.
#[derive(Debug, Error, Diagnostic)]
#[error("executor failed at node '{node_id}': {cause}")]
#[diagnostic(
    code(weftrun::engine::executor),
    help("The failure is recorded as a failed node_end and escalates to a run-level failure.")
)]
pub struct ExecutorError {
    pub node_id: String,
    pub cause: String,
}

impl ExecutorError {
    #[must_use]
    pub fn new(node_id: &str, cause: impl Into<String>) -> Self {
        Self {
            node_id: node_id.to_string(),
            cause: cause.into(),
        }
    }
}

/// Execution context handed to the executor for one node invocation.
///
/// Carries the tracer handle so executors can narrate long-running work
/// (phases, progress) and spawn sub-agent runs under a child context.
#[derive(Clone)]
pub struct NodeCtx {
    pub node_id: String,
    /// Step number within the run, starting at 1.
    pub step: u64,
    pub tracer: Tracer,
}

impl NodeCtx {
    /// Emit a progress update scoped to this node's run context.
    pub fn progress(&self, message: &str, fraction: Option<f64>) {
        self.tracer.on_progress(message, fraction);
    }

    /// Mark the start of a named sub-stage of this node.
    pub fn phase_start(&self, name: &str) {
        self.tracer.on_phase_start(name);
    }

    /// Mark the end of a named sub-stage of this node.
    pub fn phase_end(&self, name: &str) {
        self.tracer.on_phase_end(name);
    }
}

/// The external capability that actually runs nodes.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(
        &self,
        node: &NodeSpec,
        snapshot: StateSnapshot,
        ctx: NodeCtx,
    ) -> Result<ExecutorOutput, ExecutorError>;
}
