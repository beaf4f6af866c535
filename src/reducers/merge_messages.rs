use serde_json::Value;

use super::{Append, Reducer};

/// Appends to a message-history field.
///
/// Insertion order is preserved and duplicates are never removed: two
/// branches may legitimately emit distinct messages with identical text, and
/// the history reflects true chronology.
pub struct MergeMessages;

impl Reducer for MergeMessages {
    fn apply(&self, current: &mut Value, incoming: Value) {
        // Mechanically an ordered concat; kept as its own reducer because
        // message histories must never gain dedup or reordering behavior.
        Append.apply(current, incoming);
    }
}
