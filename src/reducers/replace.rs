use serde_json::Value;

use super::Reducer;

/// Overwrites the current value with the incoming one.
pub struct Replace;

impl Reducer for Replace {
    fn apply(&self, current: &mut Value, incoming: Value) {
        *current = incoming;
    }
}
