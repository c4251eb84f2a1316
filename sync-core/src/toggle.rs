//! Toggle targets for on/off entities.
//!
//! The desired value is the inverse of whatever the local snapshot last
//! said. A stale snapshot can produce the wrong target; the next refetch
//! shows the real outcome.

use serde_json::Value;
use sync_types::Snapshot;

/// Field holding the on/off flag on circuits and features.
pub const ON_FIELD: &str = "isOn";

/// Last known on/off value of entity `id` in the array at `pointer`.
pub fn last_known(snapshot: Option<&Snapshot>, pointer: &str, id: i64) -> Option<bool> {
    snapshot?
        .entity(pointer, id)?
        .get(ON_FIELD)
        .and_then(Value::as_bool)
}

/// Value to send for a toggle. Unknown entities are treated as off.
pub fn toggle_target(snapshot: Option<&Snapshot>, pointer: &str, id: i64) -> bool {
    !last_known(snapshot, pointer, id).unwrap_or(false)
}
