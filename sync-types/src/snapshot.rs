//! The full remote-state document.

use serde_json::Value;
use std::time::SystemTime;

/// Top-level entity collections a complete state document carries.
pub const EXPECTED_COLLECTIONS: [&str; 4] = ["circuits", "features", "pumps", "temps"];

/// The full, opaque controller state as last fetched.
///
/// Snapshots are immutable; a newer fetch produces a new snapshot that
/// replaces this one wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    document: Value,
    fetched_at: SystemTime,
}

impl Snapshot {
    /// Wrap a freshly fetched document.
    pub fn new(document: Value) -> Self {
        Self {
            document,
            fetched_at: SystemTime::now(),
        }
    }

    /// The raw document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// When the document was fetched.
    pub fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    /// Whether the document carries every expected entity collection.
    ///
    /// A partial document is still stored; consumers decide what to show.
    pub fn is_complete(&self) -> bool {
        match self.document.as_object() {
            Some(object) => EXPECTED_COLLECTIONS
                .iter()
                .all(|key| object.contains_key(*key)),
            None => false,
        }
    }

    /// Find the entity with the given `id` in the array at `pointer`.
    ///
    /// `pointer` is a JSON pointer such as `/circuits` or `/temps/bodies`.
    pub fn entity(&self, pointer: &str, id: i64) -> Option<&Value> {
        self.document
            .pointer(pointer)?
            .as_array()?
            .iter()
            .find(|entity| entity.get("id").and_then(Value::as_i64) == Some(id))
    }
}
