//! Working-snapshot production: one isolated deep copy per in-flight
//! operation.
//!
//! The snapshot must share no mutable substructure with the canonical
//! document — every collection and string is owned data, so `Clone` is a
//! full structural copy and cannot fail. The `StoreError::Serialization`
//! variant covers the encode path in persistence instead, which also runs
//! before the canonical pointer swap (see DESIGN.md).
//!
//! O(size) per operation is accepted: documents are bounded by the
//! configured maxima. A copy-on-write structure would remove the copy but
//! is an efficiency concern, not a correctness one.

use anyhow::Result;

use crate::model::TrackerState;

/// Produce a working snapshot of the canonical state for one operation.
/// The snapshot is owned by that operation and never outlives it.
pub fn snapshot(state: &TrackerState) -> Result<TrackerState> {
    Ok(state.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectStatus};

    #[test]
    fn snapshot_is_structurally_independent() {
        let mut original = TrackerState::new();
        original.projects.push(Project {
            id: "p1".into(),
            name: "alpha".into(),
            description: String::new(),
            status: ProjectStatus::Active,
            created_at: 1,
            updated_at: 1,
        });

        let mut snap = snapshot(&original).unwrap();
        snap.projects[0].name = "mutated".into();
        snap.projects.push(Project {
            id: "p2".into(),
            name: "extra".into(),
            description: String::new(),
            status: ProjectStatus::Active,
            created_at: 2,
            updated_at: 2,
        });
        snap.meta.current_project_id = Some("p2".into());

        assert_eq!(original.projects.len(), 1);
        assert_eq!(original.projects[0].name, "alpha");
        assert_eq!(original.meta.current_project_id, None);
    }
}
