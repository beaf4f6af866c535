use serde_json::Value;

use super::Reducer;

/// Concatenates the incoming value onto an ordered sequence field.
///
/// An incoming array is concatenated element-wise; a scalar is pushed as one
/// element. A field holding a non-array (first write after a scalar default)
/// is promoted to a one-element sequence before appending, so element
/// boundaries are preserved - `[a]` then `[b]` always yields `[a, b]`, never
/// a scalar concatenation.
pub struct Append;

impl Reducer for Append {
    fn apply(&self, current: &mut Value, incoming: Value) {
        if !current.is_array() {
            let seed = match current.take() {
                Value::Null => Vec::new(),
                existing => vec![existing],
            };
            *current = Value::Array(seed);
        }
        if let Value::Array(items) = current {
            match incoming {
                Value::Array(incoming_items) => items.extend(incoming_items),
                scalar => items.push(scalar),
            }
        }
    }
}
