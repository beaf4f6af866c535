//! Per-run identity and the nested execution-context arena.
//!
//! Every run (top-level or sub-agent) owns one [`ExecutionContext`]. Child
//! contexts form a tree rooted at the top-level run; the tree is held in an
//! arena indexed by execution id, with children storing a parent id rather
//! than a handle, and exists only for the lifetime of the run.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::utils::id_generator::IdGenerator;

/// Identity and position of one run within a possibly nested execution tree.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionContext {
    pub execution_id: String,
    /// Back-reference by id only; the arena owns the records.
    pub parent_execution_id: Option<String>,
    /// 0 for the top-level run, incremented per nesting level.
    pub depth: u32,
    /// Ordered human-readable names from root to current.
    pub execution_path: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Context for a top-level run.
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self {
            execution_id: IdGenerator::new().generate_execution_id(),
            parent_execution_id: None,
            depth: 0,
            execution_path: vec![name.to_string()],
            started_at: Utc::now(),
        }
    }

    /// Context for a nested sub-agent run.
    #[must_use]
    pub fn child(&self, sub_id: &str, sub_name: &str) -> Self {
        let mut execution_path = self.execution_path.clone();
        execution_path.push(sub_name.to_string());
        Self {
            execution_id: sub_id.to_string(),
            parent_execution_id: Some(self.execution_id.clone()),
            depth: self.depth + 1,
            execution_path,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// `"root > child > grandchild"` rendering of the execution path.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.execution_path.join(" > ")
    }
}

/// Arena of execution contexts for one run tree, indexed by execution id.
///
/// Owned by the tracer's shared state and torn down atomically with it at
/// run end.
#[derive(Debug, Default)]
pub struct ContextArena {
    contexts: FxHashMap<String, ExecutionContext>,
}

impl ContextArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, context: ExecutionContext) {
        self.contexts
            .insert(context.execution_id.clone(), context);
    }

    #[must_use]
    pub fn get(&self, execution_id: &str) -> Option<&ExecutionContext> {
        self.contexts.get(execution_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_extends_path_and_depth() {
        let root = ExecutionContext::root("orchestrator");
        let child = root.child("exec-child", "researcher");

        assert_eq!(child.depth, 1);
        assert_eq!(
            child.parent_execution_id.as_deref(),
            Some(root.execution_id.as_str())
        );
        assert_eq!(child.path_string(), "orchestrator > researcher");
    }

    #[test]
    fn test_arena_indexing() {
        let mut arena = ContextArena::new();
        let root = ExecutionContext::root("main");
        let id = root.execution_id.clone();
        arena.insert(root);

        assert_eq!(arena.len(), 1);
        assert!(arena.get(&id).is_some());
        assert!(arena.get("missing").is_none());
    }
}
