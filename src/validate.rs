//! Integrity validation of a candidate state before it may become
//! canonical.
//!
//! Three layers, in order:
//! - structural (always): schema version must match;
//! - cardinality (always): collection sizes within configured maxima;
//! - referential (only when the changed-part hint includes tasks or
//!   memories): tasks resolve their project/parent, memories resolve
//!   their project/task. A dangling current-project pointer is
//!   auto-cleared instead of rejected.
//!
//! Validation runs entirely against the working snapshot: nothing is
//! partially applied on rejection.

use anyhow::Result;
use log::warn;

use crate::config::TrackConfig;
use crate::errors::StoreError;
use crate::model::{ChangedParts, TrackerState, SCHEMA_VERSION};

pub fn validate(
    state: &mut TrackerState,
    changed: ChangedParts,
    cfg: &TrackConfig,
) -> Result<()> {
    // ----- structural -----
    if state.meta.schema_version != SCHEMA_VERSION {
        return Err(StoreError::Validation(format!(
            "unsupported schema version {} (expected {})",
            state.meta.schema_version, SCHEMA_VERSION
        ))
        .into());
    }

    // ----- cardinality (every commit) -----
    check_capacity("projects", state.projects.len(), cfg.max_projects)?;
    check_capacity("tasks", state.tasks.len(), cfg.max_tasks)?;
    check_capacity("memories", state.memories.len(), cfg.max_memories)?;

    // ----- referential (scoped by the declared hint) -----
    if changed.touches_references() {
        check_references(state)?;
    }

    Ok(())
}

fn check_capacity(collection: &'static str, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(StoreError::CapacityExceeded {
            collection,
            len,
            max,
        }
        .into());
    }
    Ok(())
}

fn check_references(state: &mut TrackerState) -> Result<()> {
    for task in &state.tasks {
        if state.projects.iter().all(|p| p.id != task.project_id) {
            return Err(StoreError::Validation(format!(
                "task '{}' references missing project '{}'",
                task.id, task.project_id
            ))
            .into());
        }
        if let Some(parent) = &task.parent_id {
            if state.tasks.iter().all(|t| t.id != *parent) {
                return Err(StoreError::Validation(format!(
                    "task '{}' references missing parent task '{}'",
                    task.id, parent
                ))
                .into());
            }
        }
    }

    for mem in &state.memories {
        if let Some(pid) = &mem.project_id {
            if state.projects.iter().all(|p| p.id != *pid) {
                return Err(StoreError::Validation(format!(
                    "memory '{}' references missing project '{}'",
                    mem.id, pid
                ))
                .into());
            }
        }
        if let Some(tid) = &mem.task_id {
            if state.tasks.iter().all(|t| t.id != *tid) {
                return Err(StoreError::Validation(format!(
                    "memory '{}' references missing task '{}'",
                    mem.id, tid
                ))
                .into());
            }
        }
    }

    // Self-healing: a dangling current-project pointer is cleared, not
    // rejected.
    if let Some(cur) = state.meta.current_project_id.clone() {
        if state.project(&cur).is_none() {
            warn!("clearing dangling current project pointer '{}'", cur);
            state.meta.current_project_id = None;
        }
    }

    Ok(())
}
