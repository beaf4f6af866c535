//! Persistence capability consumed by the execution engine.
//!
//! Persistence is an external collaborator: the engine only needs to load
//! raw definition documents and save run summaries. The trait is async so
//! real backends can do I/O; [`InMemoryPersistence`] is the volatile
//! implementation used in tests and development.

use async_trait::async_trait;
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::definition::GraphDefinition;
use crate::tracer::{TimelineEntry, Tracer};

/// Errors raised by persistence backends.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("definition not found: {id}")]
    #[diagnostic(code(weftrun::persistence::not_found))]
    NotFound { id: String },

    #[error("persistence backend error: {0}")]
    #[diagnostic(code(weftrun::persistence::backend))]
    Backend(String),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(code(weftrun::persistence::serde))]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// Snapshot of a finished (or stopped) run, persisted verbatim.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub timeline: Vec<TimelineEntry>,
    pub node_outputs: FxHashMap<String, Value>,
    pub node_order: Vec<String>,
    /// Node id to human-readable name, for rendering timelines later.
    pub node_names: FxHashMap<String, String>,
}

impl RunSummary {
    /// Capture the current tracer state plus node names from the definition.
    #[must_use]
    pub fn capture(tracer: &Tracer, definition: &GraphDefinition) -> Self {
        let node_names = definition
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.name.clone()))
            .collect();
        Self {
            timeline: tracer.timeline(),
            node_outputs: tracer.node_outputs(),
            node_order: tracer.node_order(),
            node_names,
        }
    }
}

/// Storage capability: load raw definitions, save run summaries.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Load a stored definition document by id. The document may be a legacy
    /// schema; callers run it through the migrator.
    async fn load_definition(&self, id: &str) -> Result<Value, PersistenceError>;

    /// Persist the summary of one run under its run id.
    async fn save_run_summary(
        &self,
        run_id: &str,
        summary: RunSummary,
    ) -> Result<(), PersistenceError>;
}

/// Volatile persistence for testing and development.
#[derive(Default)]
pub struct InMemoryPersistence {
    definitions: RwLock<FxHashMap<String, Value>>,
    summaries: RwLock<FxHashMap<String, RunSummary>>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw definition document under an id.
    pub fn insert_definition(&self, id: &str, raw: Value) {
        self.definitions.write().insert(id.to_string(), raw);
    }

    /// Read back a saved summary.
    #[must_use]
    pub fn summary(&self, run_id: &str) -> Option<RunSummary> {
        self.summaries.read().get(run_id).cloned()
    }

    /// Number of summaries saved so far.
    #[must_use]
    pub fn summary_count(&self) -> usize {
        self.summaries.read().len()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn load_definition(&self, id: &str) -> Result<Value, PersistenceError> {
        self.definitions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound { id: id.to_string() })
    }

    async fn save_run_summary(
        &self,
        run_id: &str,
        summary: RunSummary,
    ) -> Result<(), PersistenceError> {
        self.summaries.write().insert(run_id.to_string(), summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryPersistence::new();
        store.insert_definition("agent-1", json!({"version": "2.0"}));

        let loaded = store.load_definition("agent-1").await.unwrap();
        assert_eq!(loaded["version"], "2.0");

        let missing = store.load_definition("agent-2").await;
        assert!(matches!(missing, Err(PersistenceError::NotFound { .. })));

        store
            .save_run_summary("run-1", RunSummary::default())
            .await
            .unwrap();
        assert!(store.summary("run-1").is_some());
        assert_eq!(store.summary_count(), 1);
    }
}
