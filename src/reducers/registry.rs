use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

use super::{Append, MergeMessages, Reducer, ReducerError, Replace};
use crate::definition::ReducerKind;

/// Registry mapping [`ReducerKind`] to reducer implementations.
///
/// The default registry wires the three built-in strategies. Additional
/// reducers can be registered at construction time; the registry is then
/// shared read-only by the state container.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ReducerKind, Arc<dyn Reducer>>,
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register(ReducerKind::Replace, Arc::new(Replace))
            .register(ReducerKind::Append, Arc::new(Append))
            .register(ReducerKind::MergeMessages, Arc::new(MergeMessages));
        registry
    }
}

impl ReducerRegistry {
    /// Creates a new empty reducer registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Registers a reducer for a kind, replacing any previous registration.
    ///
    /// Returns a mutable reference to self for method chaining.
    pub fn register(&mut self, kind: ReducerKind, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.insert(kind, reducer);
        self
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with_reducer(mut self, kind: ReducerKind, reducer: Arc<dyn Reducer>) -> Self {
        self.register(kind, reducer);
        self
    }

    /// Fold `incoming` into `current` using the reducer registered for
    /// `kind`.
    pub fn apply(
        &self,
        kind: ReducerKind,
        current: &mut Value,
        incoming: Value,
    ) -> Result<(), ReducerError> {
        match self.reducer_map.get(&kind) {
            Some(reducer) => {
                reducer.apply(current, incoming);
                Ok(())
            }
            None => Err(ReducerError::UnknownKind(kind)),
        }
    }
}
