//! Typed mutation builders over the submission API.
//!
//! The store core is domain-agnostic: it runs whatever closure it is
//! handed. These helpers are the thin business-collaborator layer used by
//! the CLI and tests — each returns a closure suitable for
//! `Store::submit`, constructs records with freshly minted UUIDs, and
//! declares the parts it touched.
//!
//! Cross-entity business checks that the scoped validator would not see
//! (e.g. pointing `current_project_id` at a ghost with a meta-only hint)
//! are enforced here.

use anyhow::Result;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::model::{
    ChangedParts, Memory, Outcome, Project, ProjectStatus, Task, TaskStatus, TrackerState,
};
use crate::util::now_secs;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn create_project(
    name: impl Into<String>,
    description: impl Into<String>,
) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<Project>> {
    let name = name.into();
    let description = description.into();
    move |state| {
        let now = now_secs();
        let project = Project {
            id: new_id(),
            name,
            description,
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        };
        state.projects.push(project.clone());
        Ok(Outcome::commit(project, ChangedParts::projects()))
    }
}

/// Remove a project and everything hanging off it: its tasks, and the
/// project/task references of memories that pointed into it (the memories
/// themselves survive, detached).
pub fn delete_project(id: impl Into<String>) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<bool>> {
    let id = id.into();
    move |state| {
        if state.project(&id).is_none() {
            return Ok(Outcome::read(false));
        }
        state.projects.retain(|p| p.id != id);

        let doomed: Vec<String> = state
            .tasks
            .iter()
            .filter(|t| t.project_id == id)
            .map(|t| t.id.clone())
            .collect();
        state.tasks.retain(|t| t.project_id != id);

        for mem in &mut state.memories {
            if mem.project_id.as_deref() == Some(id.as_str()) {
                mem.project_id = None;
            }
            if let Some(tid) = &mem.task_id {
                if doomed.contains(tid) {
                    mem.task_id = None;
                }
            }
        }

        if state.meta.current_project_id.as_deref() == Some(id.as_str()) {
            state.meta.current_project_id = None;
        }

        Ok(Outcome::commit(true, ChangedParts::ALL))
    }
}

pub fn create_task(
    project_id: impl Into<String>,
    parent_id: Option<String>,
    title: impl Into<String>,
    details: impl Into<String>,
) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<Task>> {
    let project_id = project_id.into();
    let title = title.into();
    let details = details.into();
    move |state| {
        let now = now_secs();
        let task = Task {
            id: new_id(),
            project_id,
            parent_id,
            title,
            details,
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok(Outcome::commit(task, ChangedParts::tasks()))
    }
}

pub fn set_task_status(
    id: impl Into<String>,
    status: TaskStatus,
) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<Task>> {
    let id = id.into();
    move |state| {
        let now = now_secs();
        let task = state
            .task_mut(&id)
            .ok_or_else(|| StoreError::Validation(format!("task '{id}' not found")))?;
        task.status = status;
        task.updated_at = now;
        let task = task.clone();
        Ok(Outcome::commit(task, ChangedParts::tasks()))
    }
}

/// Remove a task together with its subtask tree; memories pointing at any
/// removed task are detached.
pub fn delete_task(id: impl Into<String>) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<bool>> {
    let id = id.into();
    move |state| {
        if state.task(&id).is_none() {
            return Ok(Outcome::read(false));
        }

        let mut doomed = vec![id.clone()];
        loop {
            let before = doomed.len();
            for t in &state.tasks {
                if let Some(parent) = &t.parent_id {
                    if doomed.contains(parent) && !doomed.contains(&t.id) {
                        doomed.push(t.id.clone());
                    }
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        state.tasks.retain(|t| !doomed.contains(&t.id));
        for mem in &mut state.memories {
            if let Some(tid) = &mem.task_id {
                if doomed.contains(tid) {
                    mem.task_id = None;
                }
            }
        }

        Ok(Outcome::commit(true, ChangedParts::tasks().and_memories()))
    }
}

pub fn add_memory(
    content: impl Into<String>,
    project_id: Option<String>,
    task_id: Option<String>,
    tags: Vec<String>,
) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<Memory>> {
    let content = content.into();
    move |state| {
        let memory = Memory {
            id: new_id(),
            project_id,
            task_id,
            content,
            tags,
            created_at: now_secs(),
        };
        state.memories.push(memory.clone());
        Ok(Outcome::commit(memory, ChangedParts::memories()))
    }
}

pub fn delete_memory(id: impl Into<String>) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<bool>> {
    let id = id.into();
    move |state| {
        let before = state.memories.len();
        state.memories.retain(|m| m.id != id);
        if state.memories.len() == before {
            return Ok(Outcome::read(false));
        }
        Ok(Outcome::commit(true, ChangedParts::memories()))
    }
}

/// Point meta's current-project at an existing project, or clear it.
/// Existence is checked here: a meta-only hint does not reach the
/// referential validator.
pub fn set_current_project(
    id: Option<String>,
) -> impl FnOnce(&mut TrackerState) -> Result<Outcome<Option<String>>> {
    move |state| {
        if let Some(id) = &id {
            if state.project(id).is_none() {
                return Err(StoreError::Validation(format!(
                    "cannot select missing project '{id}'"
                ))
                .into());
            }
        }
        state.meta.current_project_id = id.clone();
        Ok(Outcome::commit(id, ChangedParts::meta()))
    }
}
