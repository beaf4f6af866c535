//! The execution engine: a frontier-driven run loop over a validated graph.
//!
//! States of the machine are node ids plus the virtual `START`/`END`
//! endpoints; the transition function is
//! [`ConditionEvaluator::select_next`]. Each step executes the current
//! frontier (concurrently when it fans out), folds the outputs into state
//! through the reducer contract in frontier order, reports every boundary
//! to the tracer, and advances. Termination: the frontier drains into
//! `END`, the run deadline elapses, a per-node iteration cap trips, or an
//! executor fails.

use std::time::{Duration, Instant};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use super::config::EngineConfig;
use super::executor::{ExecutorOutput, NodeCtx, NodeExecutor};
use super::result::{RunResult, StepTrace};
use crate::condition::ConditionEvaluator;
use crate::definition::{GraphDefinition, NodeConfig, NodeSpec, ReducerKind, validate};
use crate::message::Message;
use crate::persistence::{Persistence, RunSummary};
use crate::state::{StateContainer, StateSnapshot};
use crate::tracer::Tracer;
use crate::types::{NodeRef, NodeStatus, RunStatus, StopReason};

/// Errors raised when constructing an engine.
///
/// Definition problems are resolved before a run starts and block it
/// entirely; a constructed engine can always attempt a run.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("definition failed validation:\n{}", .0.join("\n"))]
    #[diagnostic(
        code(weftrun::engine::invalid_definition),
        help("Fix the reported findings; validate() lists them in check order.")
    )]
    InvalidDefinition(Vec<String>),

    #[error("graph has no nodes to execute")]
    #[diagnostic(
        code(weftrun::engine::empty_graph),
        help("An empty definition is valid but not executable.")
    )]
    EmptyGraph,
}

/// Drives the node-by-node run loop for one graph definition.
///
/// The engine owns the immutable definition and the external executor
/// capability; each run owns its own [`StateContainer`] and tracer context.
#[derive(Clone)]
pub struct ExecutionEngine {
    definition: Arc<GraphDefinition>,
    executor: Arc<dyn NodeExecutor>,
    persistence: Option<Arc<dyn Persistence>>,
    config: EngineConfig,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("definition", &self.definition)
            .field("persistence", &self.persistence.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Outcome of one node execution, produced at the step boundary.
struct ExecutedNode {
    node: NodeSpec,
    status: NodeStatus,
    output: Option<ExecutorOutput>,
    error: Option<String>,
    duration_ms: u64,
}

impl ExecutionEngine {
    /// Build an engine for a validated, non-empty definition.
    pub fn new(
        definition: GraphDefinition,
        executor: Arc<dyn NodeExecutor>,
    ) -> Result<Self, EngineError> {
        let errors = validate(&definition);
        if !errors.is_empty() {
            return Err(EngineError::InvalidDefinition(errors));
        }
        if definition.is_empty() {
            return Err(EngineError::EmptyGraph);
        }
        Ok(Self {
            definition: Arc::new(definition),
            executor,
            persistence: None,
            config: EngineConfig::default(),
        })
    }

    /// Attach a persistence capability for run summaries and checkpoints.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn definition(&self) -> &GraphDefinition {
        &self.definition
    }

    /// A state container seeded from the definition's schema defaults.
    #[must_use]
    pub fn seed_state(&self) -> StateContainer {
        StateContainer::new(&self.definition.state_schema)
    }

    /// Run the graph against a fresh state seeded with one user message.
    pub async fn run(&self, user_input: &str) -> RunResult {
        let mut state = self.seed_state();
        state.push_message(Message::user(user_input));
        let tracer = Tracer::new(&self.definition.display_name());
        self.run_with_state(state, &tracer).await
    }

    /// Run this graph as a nested sub-agent of `parent`.
    ///
    /// The child gets its own state container and a child execution context
    /// (depth + 1); its events interleave into the parent's timeline as
    /// `subagent_start`/`subagent_end` plus the child's node events.
    pub async fn run_subagent(
        &self,
        parent: &Tracer,
        sub_id: &str,
        sub_name: &str,
        state: StateContainer,
    ) -> RunResult {
        let child = parent.child_context(sub_id, sub_name);
        self.run_with_state(state, &child).await
    }

    /// Run the graph with an explicit state container and tracer.
    #[instrument(skip_all, fields(run_id = %self.config.run_id))]
    pub async fn run_with_state(&self, mut state: StateContainer, tracer: &Tracer) -> RunResult {
        let started = Instant::now();
        let deadline_secs = self
            .definition
            .max_execution_time_seconds
            .unwrap_or(self.config.max_execution_time_seconds);
        let deadline = Duration::from_secs(deadline_secs);

        tracer.on_run_start();

        let evaluator = ConditionEvaluator::new(&self.definition.edges);
        let mut frontier = vec![self.definition.entry_point.clone()];
        let mut visits: FxHashMap<String, u32> = FxHashMap::default();
        let mut step: u64 = 0;
        let mut step_trace: Vec<StepTrace> = Vec::new();
        let mut status = RunStatus::Completed;
        let mut error_message: Option<String> = None;
        let mut failed_node: Option<String> = None;

        'run: while !frontier.is_empty() {
            // Deadline is checked only at step boundaries: in-flight nodes
            // get the remaining budget, nothing new starts past it.
            if started.elapsed() >= deadline {
                status = RunStatus::Stopped(StopReason::Timeout);
                error_message = Some(format!("run exceeded the {deadline_secs}s deadline"));
                break;
            }
            step += 1;

            for node_id in &frontier {
                let visit = visits.entry(node_id.clone()).or_insert(0);
                *visit += 1;
                if let Some(node) = self.definition.node(node_id)
                    && let NodeConfig::Llm(llm) = &node.config
                    && *visit > llm.max_iterations
                {
                    status = RunStatus::Stopped(StopReason::IterationLimit);
                    error_message = Some(format!(
                        "node '{node_id}' exceeded its iteration cap of {}",
                        llm.max_iterations
                    ));
                    break 'run;
                }
            }

            let remaining = deadline.saturating_sub(started.elapsed());
            let outcomes = self
                .execute_frontier(&frontier, &state, tracer, step, remaining, &visits)
                .await;

            // Barrier: fold outputs into state in frontier order so merges
            // stay deterministic regardless of completion order.
            for executed in outcomes {
                let node_id = executed.node.id.clone();
                let visit = visits.get(&node_id).copied().unwrap_or(1);
                step_trace.push(StepTrace {
                    step,
                    node_id: node_id.clone(),
                    status: executed.status,
                    duration_ms: executed.duration_ms,
                });
                match executed.status {
                    NodeStatus::Completed => {
                        let output = executed.output.unwrap_or_default();
                        let written = self.written_value(&executed.node, &output, &state);
                        let key = executed.node.output_key().to_string();
                        if let Err(e) = state.apply(&key, written) {
                            status = RunStatus::Failed;
                            error_message =
                                Some(format!("state update for '{key}' failed: {e}"));
                            failed_node = Some(node_id);
                            break 'run;
                        }
                        tracer.on_state_update(&key, reducer_name(state.reducer_for(&key)));
                        if visit > 1 {
                            tracer.on_iteration_end(&node_id, visit);
                        }
                    }
                    NodeStatus::Failed => {
                        let message = executed
                            .error
                            .unwrap_or_else(|| format!("node '{node_id}' failed"));
                        tracer.on_run_error(&message);
                        status = RunStatus::Failed;
                        error_message = Some(message);
                        failed_node = Some(node_id);
                        break 'run;
                    }
                    NodeStatus::TimedOut => {
                        status = RunStatus::Stopped(StopReason::Timeout);
                        error_message = executed.error;
                        break 'run;
                    }
                }
            }

            if self.definition.enable_checkpoints {
                self.save_summary(tracer).await;
            }

            let mut next: Vec<String> = Vec::new();
            for node_id in &frontier {
                for target in evaluator.select_next(node_id, &state) {
                    if NodeRef::parse(&target).is_end() {
                        continue;
                    }
                    if !next.contains(&target) {
                        next.push(target);
                    }
                }
            }
            frontier = next;
        }

        // A failed run leaves the failed node_end as the last timeline
        // entry; completed and stopped runs close with an end event.
        if status != RunStatus::Failed {
            tracer.on_run_end(status);
        }
        self.save_summary(tracer).await;

        RunResult {
            status,
            final_state: state.into_fields(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            step_trace,
            error_message,
            failed_node,
        }
    }

    /// Execute every frontier node against one consistent snapshot.
    ///
    /// Start events are emitted in frontier order before any node begins,
    /// which fixes their timeline sequence; a multi-node frontier then runs
    /// concurrently and results are collected back in frontier order.
    async fn execute_frontier(
        &self,
        frontier: &[String],
        state: &StateContainer,
        tracer: &Tracer,
        step: u64,
        remaining: Duration,
        visits: &FxHashMap<String, u32>,
    ) -> Vec<ExecutedNode> {
        let snapshot = state.snapshot();

        let mut specs: Vec<NodeSpec> = Vec::with_capacity(frontier.len());
        for node_id in frontier {
            let Some(node) = self.definition.node(node_id) else {
                // Unreachable for validated definitions; recorded as a
                // failure rather than a panic.
                tracer.on_node_start(node_id, "unknown", None);
                tracer.on_node_end(node_id, NodeStatus::Failed, None);
                return vec![ExecutedNode {
                    node: NodeSpec::transform(node_id, node_id, "output"),
                    status: NodeStatus::Failed,
                    output: None,
                    error: Some(format!("frontier references unknown node '{node_id}'")),
                    duration_ms: 0,
                }];
            };
            let visit = visits.get(node_id).copied().unwrap_or(1);
            if visit > 1 {
                tracer.on_iteration_start(node_id, visit);
            }
            tracer.on_node_start(node_id, node.node_type(), None);
            specs.push(node.clone());
        }

        if specs.len() == 1 {
            let spec = specs.remove(0);
            return vec![
                execute_node(
                    self.executor.clone(),
                    spec,
                    snapshot,
                    tracer.clone(),
                    step,
                    remaining,
                )
                .await,
            ];
        }

        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            handles.push(tokio::spawn(execute_node(
                self.executor.clone(),
                spec,
                snapshot.clone(),
                tracer.clone(),
                step,
                remaining,
            )));
        }

        let joined = futures_util::future::join_all(handles).await;
        let mut outcomes = Vec::with_capacity(joined.len());
        for (node_id, joined_result) in frontier.iter().zip(joined) {
            match joined_result {
                Ok(executed) => outcomes.push(executed),
                Err(join_error) => {
                    tracer.on_node_end(node_id, NodeStatus::Failed, None);
                    outcomes.push(ExecutedNode {
                        node: NodeSpec::transform(node_id, node_id, "output"),
                        status: NodeStatus::Failed,
                        output: None,
                        error: Some(format!("node task join error: {join_error}")),
                        duration_ms: 0,
                    });
                }
            }
        }
        outcomes
    }

    /// The value actually reduced into state for one node output.
    ///
    /// Model responses are recorded as assistant messages carrying their
    /// tool calls, which is what built-in edge conditions inspect. Tool
    /// results become tool-role messages when their output field is a
    /// message history; transforms write their output verbatim.
    fn written_value(
        &self,
        node: &NodeSpec,
        output: &ExecutorOutput,
        state: &StateContainer,
    ) -> Value {
        match &node.config {
            NodeConfig::Llm(_) => Message::assistant(&content_string(&output.output))
                .with_tool_calls(output.tool_calls.clone())
                .to_value(),
            NodeConfig::Tool(tool) => {
                if state.reducer_for(&tool.output_key) == ReducerKind::MergeMessages {
                    Message::tool(&content_string(&output.output)).to_value()
                } else {
                    output.output.clone()
                }
            }
            NodeConfig::Transform(_) => output.output.clone(),
        }
    }

    async fn save_summary(&self, tracer: &Tracer) {
        if let Some(persistence) = &self.persistence {
            let summary = RunSummary::capture(tracer, &self.definition);
            if let Err(e) = persistence
                .save_run_summary(&self.config.run_id, summary)
                .await
            {
                tracing::warn!(error = %e, run_id = %self.config.run_id, "run summary save failed");
            }
        }
    }
}

/// Run one node's executor with the remaining deadline budget and report
/// the boundary to the tracer.
async fn execute_node(
    executor: Arc<dyn NodeExecutor>,
    node: NodeSpec,
    snapshot: StateSnapshot,
    tracer: Tracer,
    step: u64,
    remaining: Duration,
) -> ExecutedNode {
    let ctx = NodeCtx {
        node_id: node.id.clone(),
        step,
        tracer: tracer.clone(),
    };
    let node_started = Instant::now();
    let result = tokio::time::timeout(remaining, executor.execute(&node, snapshot, ctx)).await;
    let duration_ms = node_started.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(output)) => {
            tracer.on_node_end(&node.id, NodeStatus::Completed, Some(output.output.clone()));
            ExecutedNode {
                node,
                status: NodeStatus::Completed,
                output: Some(output),
                error: None,
                duration_ms,
            }
        }
        Ok(Err(executor_error)) => {
            tracer.on_node_end(&node.id, NodeStatus::Failed, None);
            ExecutedNode {
                node,
                status: NodeStatus::Failed,
                output: None,
                error: Some(executor_error.to_string()),
                duration_ms,
            }
        }
        Err(_elapsed) => {
            tracer.on_node_end(&node.id, NodeStatus::TimedOut, None);
            let error = Some(format!(
                "node '{}' did not finish before the run deadline",
                node.id
            ));
            ExecutedNode {
                node,
                status: NodeStatus::TimedOut,
                output: None,
                error,
                duration_ms,
            }
        }
    }
}

fn content_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn reducer_name(kind: ReducerKind) -> &'static str {
    match kind {
        ReducerKind::Replace => "replace",
        ReducerKind::Append => "append",
        ReducerKind::MergeMessages => "merge-messages",
    }
}
