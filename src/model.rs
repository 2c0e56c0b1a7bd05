//! Canonical document model: projects, tasks, memories, meta.
//!
//! The whole document is one value (`TrackerState`). It is never mutated in
//! place once published: operations work on a deep copy and the commit path
//! swaps the canonical pointer wholesale, so readers always observe a fully
//! committed document.
//!
//! Invariants on any canonical state:
//! - every task's `project_id` resolves to an existing project;
//! - every task's `parent_id` resolves to an existing task, or is absent;
//! - every memory's `project_id`/`task_id` resolves, or is absent;
//! - `meta.current_project_id` resolves, or is absent;
//! - collection sizes stay within configured maxima.

use serde::{Deserialize, Serialize};

/// Current on-disk / in-memory schema version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Done,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Owning project; must resolve on any committed state.
    pub project_id: String,
    /// Optional parent task for subtask trees.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: u64,
}

/// Document-level bookkeeping block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub schema_version: u32,
    /// Stamped by the commit path on every committed operation.
    pub updated_at: u64,
    /// Bumped once per persistent open.
    pub session_count: u64,
    #[serde(default)]
    pub current_project_id: Option<String>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            updated_at: 0,
            session_count: 0,
            current_project_id: None,
        }
    }
}

/// The single authoritative document. Collections stay plain vectors:
/// maxima are small and lookups go through the linear `project`/`task`/
/// `memory` helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerState {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub memories: Vec<Memory>,
    #[serde(default)]
    pub meta: Meta,
}

impl TrackerState {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            tasks: Vec::new(),
            memories: Vec::new(),
            meta: Meta::default(),
        }
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn memory(&self, id: &str) -> Option<&Memory> {
        self.memories.iter().find(|m| m.id == id)
    }

    /// (projects, tasks, memories) counts, for status output.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.projects.len(), self.tasks.len(), self.memories.len())
    }
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared (not inferred) hint naming which parts of the document an
/// operation touched. Scopes referential validation and disk writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedParts {
    pub projects: bool,
    pub tasks: bool,
    pub memories: bool,
    pub meta: bool,
}

impl ChangedParts {
    pub const NONE: ChangedParts = ChangedParts {
        projects: false,
        tasks: false,
        memories: false,
        meta: false,
    };

    pub const ALL: ChangedParts = ChangedParts {
        projects: true,
        tasks: true,
        memories: true,
        meta: true,
    };

    pub fn projects() -> Self {
        Self {
            projects: true,
            ..Self::NONE
        }
    }

    pub fn tasks() -> Self {
        Self {
            tasks: true,
            ..Self::NONE
        }
    }

    pub fn memories() -> Self {
        Self {
            memories: true,
            ..Self::NONE
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    pub fn and_projects(mut self) -> Self {
        self.projects = true;
        self
    }

    pub fn and_tasks(mut self) -> Self {
        self.tasks = true;
        self
    }

    pub fn and_memories(mut self) -> Self {
        self.memories = true;
        self
    }

    pub fn and_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn any(&self) -> bool {
        self.projects || self.tasks || self.memories || self.meta
    }

    /// Referential invariants are only re-checked when tasks or memories
    /// changed (documented trade-off inherited from the source design).
    pub fn touches_references(&self) -> bool {
        self.tasks || self.memories
    }
}

/// What an operation function hands back to the serializer:
/// the caller-visible value, whether to commit, and the changed-part hint.
#[derive(Debug)]
pub struct Outcome<R> {
    pub value: R,
    pub commit: bool,
    pub changed: ChangedParts,
}

impl<R> Outcome<R> {
    /// A committing outcome with a declared change scope.
    pub fn commit(value: R, changed: ChangedParts) -> Self {
        Self {
            value,
            commit: true,
            changed,
        }
    }

    /// A pure read: no commit, no durability implication.
    pub fn read(value: R) -> Self {
        Self {
            value,
            commit: false,
            changed: ChangedParts::NONE,
        }
    }
}
