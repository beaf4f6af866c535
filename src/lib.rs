//! # Weftrun: Workflow Execution Core for AI Agents
//!
//! Weftrun compiles directed-graph descriptions of agent behavior into
//! step-by-step executions over a reducer-merged state container, while a
//! tracer turns every lifecycle transition into a replayable, ordered event
//! timeline suitable for live streaming and persistence.
//!
//! ## Core Concepts
//!
//! - **GraphDefinition**: Typed, serde-backed description of nodes, edges,
//!   and the state schema; validated before execution and migrated from
//!   older schema versions.
//! - **StateContainer**: The single mutable state of one run, written only
//!   through reducers (`replace`, `append`, `merge-messages`).
//! - **ConditionEvaluator**: Decides which outgoing edges fire, with
//!   priority and declaration-order tie-breaks.
//! - **ExecutionEngine**: Drives the node-by-node run loop against an
//!   external [`NodeExecutor`](engine::NodeExecutor) capability.
//! - **Tracer**: Observes step boundaries, appends [`TimelineEntry`](tracer::TimelineEntry)
//!   records, and forwards transport-ready event envelopes.
//! - **TemplateRegistry**: Catalogs prebuilt system agents and reusable node
//!   components for discovery and forking.
//!
//! ## Quick Start
//!
//! ### Defining and validating a graph
//!
//! ```
//! use weftrun::definition::{
//!     Edge, GraphDefinition, NodeSpec, StateFieldSchema, validate,
//! };
//!
//! let mut def = GraphDefinition::empty();
//! def.entry_point = "echo".to_string();
//! def.nodes.push(NodeSpec::transform("echo", "Echo", "output"));
//! def.edges.push(Edge::new("echo", "END"));
//! def.state_schema
//!     .insert("output".to_string(), StateFieldSchema::value());
//!
//! assert!(validate(&def).is_empty());
//! ```
//!
//! ### Migrating a stored definition
//!
//! Legacy (`"1.0"`) documents are upgraded in place; empty legacy documents
//! become the default reason/act template:
//!
//! ```
//! use serde_json::json;
//! use weftrun::definition::migrate;
//!
//! let def = migrate(json!({"version": "1.0"})).unwrap();
//! assert_eq!(def.nodes.len(), 2);
//! assert_eq!(def.edges.len(), 4);
//! ```
//!
//! ### Running a graph
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use weftrun::definition::NodeSpec;
//! use weftrun::engine::{
//!     ExecutionEngine, ExecutorError, ExecutorOutput, NodeCtx, NodeExecutor,
//! };
//! use weftrun::state::StateSnapshot;
//!
//! struct EchoExecutor;
//!
//! #[async_trait]
//! impl NodeExecutor for EchoExecutor {
//!     async fn execute(
//!         &self,
//!         node: &NodeSpec,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeCtx,
//!     ) -> Result<ExecutorOutput, ExecutorError> {
//!         Ok(ExecutorOutput::value(serde_json::json!(format!(
//!             "ran {}",
//!             node.id
//!         ))))
//!     }
//! }
//!
//! # async fn example(def: weftrun::definition::GraphDefinition) -> Result<(), weftrun::engine::EngineError> {
//! let engine = ExecutionEngine::new(def, Arc::new(EchoExecutor))?;
//! let result = engine.run("hello").await;
//! assert!(result.success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`definition`] - Graph definition model, validator, and migrator
//! - [`state`] - State container and snapshots
//! - [`reducers`] - State merge strategies and the reducer registry
//! - [`condition`] - Edge condition evaluation and routing
//! - [`engine`] - Execution engine, executor capability, run results
//! - [`tracer`] - Timeline tracer, event envelopes, event bus and sinks
//! - [`registry`] - System-agent and component catalogs
//! - [`persistence`] - Persistence capability consumed by the engine
//! - [`telemetry`] - Formatting and tracing subscriber setup

pub mod condition;
pub mod definition;
pub mod engine;
pub mod message;
pub mod persistence;
pub mod reducers;
pub mod registry;
pub mod state;
pub mod telemetry;
pub mod tracer;
pub mod types;
pub mod utils;
