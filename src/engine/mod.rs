//! Execution engine: run loop, executor capability, configuration, and
//! results.
//!
//! See [`ExecutionEngine`] for the run-loop semantics and
//! [`NodeExecutor`] for the capability contract the engine consumes.

mod config;
mod executor;
mod result;
mod runner;

pub use config::{DEFAULT_MAX_EXECUTION_SECONDS, EngineConfig};
pub use executor::{ExecutorError, ExecutorOutput, NodeCtx, NodeExecutor};
pub use result::{RunResult, StepTrace};
pub use runner::{EngineError, ExecutionEngine};
