//! Change detection between snapshot generations.

use crate::model::ClusterSnapshot;

/// True when `current` differs from `previous`.
///
/// Comparison is over the typed snapshots, so JSON key order and
/// whitespace in the persisted files never register as a change, while any
/// value difference in any record does.
#[must_use]
pub fn detect_change(current: &ClusterSnapshot, previous: &ClusterSnapshot) -> bool {
    current != previous
}
