//! State merge strategies and conflict-free reduction.
//!
//! Every write into a [`StateContainer`](crate::state::StateContainer) goes
//! through a reducer selected by the field's schema. Reducers mutate the
//! current field value in place using the incoming value; they never touch
//! any other field.

mod append;
mod merge_messages;
mod registry;
mod replace;

pub use append::Append;
pub use merge_messages::MergeMessages;
pub use registry::ReducerRegistry;
pub use replace::Replace;

use crate::definition::ReducerKind;
use serde_json::Value;
use std::fmt;

/// Unified reducer trait: every reducer folds an incoming value into the
/// current value of one state field.
pub trait Reducer: Send + Sync {
    fn apply(&self, current: &mut Value, incoming: Value);
}

/// Errors raised by the reducer registry.
#[derive(Debug)]
pub enum ReducerError {
    UnknownKind(ReducerKind),
}

impl fmt::Display for ReducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerError::UnknownKind(kind) => {
                write!(f, "no reducer registered for kind: {kind:?}")
            }
        }
    }
}

impl std::error::Error for ReducerError {}
