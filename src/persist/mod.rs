//! Split-file YAML persistence for the canonical document.
//!
//! Layout of a store directory:
//! - projects.yaml / tasks.yaml / memories.yaml / meta.yaml — one
//!   independently serialized partition per collection plus meta, each with
//!   optional rotating `.backup.1..K` siblings;
//! - store.lock — JSON lock descriptor (see `crate::lock`).
//!
//! Save path: partitions named in the changed-part hint are encoded first
//! (`prepare`, catching serialization failures before the canonical swap),
//! then written via backup rotation + tmp+rename (`apply`). The meta
//! partition is included in every save — commit always stamps
//! `meta.updated_at`, so meta has always materially changed (the
//! deterministic rule chosen in DESIGN.md).
//!
//! Load path: a missing partition defaults to an empty collection; a
//! partition that fails schema validation is repaired to defaults with a
//! warn log instead of failing the whole load.

pub mod backup;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::TrackConfig;
use crate::errors::StoreError;
use crate::lock::StoreLock;
use crate::metrics;
use crate::model::{ChangedParts, Memory, Meta, Project, Task, TrackerState};
use crate::util::atomic_write;

use self::backup::rotate_backups;

pub const PROJECTS_FILE: &str = "projects.yaml";
pub const TASKS_FILE: &str = "tasks.yaml";
pub const MEMORIES_FILE: &str = "memories.yaml";
pub const META_FILE: &str = "meta.yaml";

/// One independently persisted segment of the canonical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Projects,
    Tasks,
    Memories,
    Meta,
}

impl Partition {
    pub fn file_name(self) -> &'static str {
        match self {
            Partition::Projects => PROJECTS_FILE,
            Partition::Tasks => TASKS_FILE,
            Partition::Memories => MEMORIES_FILE,
            Partition::Meta => META_FILE,
        }
    }
}

// Partition documents wrap their collection under a named key so a
// hand-edited or partially damaged file can still be repaired per array.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TasksFile {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoriesFile {
    #[serde(default)]
    memories: Vec<Memory>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaFile {
    #[serde(default)]
    meta: Meta,
}

// Borrowed twins of the wrappers above, so encoding never clones the
// collections.
#[derive(Serialize)]
struct ProjectsRef<'a> {
    projects: &'a [Project],
}

#[derive(Serialize)]
struct TasksRef<'a> {
    tasks: &'a [Task],
}

#[derive(Serialize)]
struct MemoriesRef<'a> {
    memories: &'a [Memory],
}

#[derive(Serialize)]
struct MetaRef<'a> {
    meta: &'a Meta,
}

/// Encoded partitions ready to hit the disk. Produced by `prepare` before
/// the canonical pointer swap, applied after it.
pub struct SaveBatch {
    entries: Vec<(Partition, Vec<u8>)>,
}

impl SaveBatch {
    pub fn partitions(&self) -> impl Iterator<Item = Partition> + '_ {
        self.entries.iter().map(|(p, _)| *p)
    }
}

/// Durable writer for one store directory. Owns the directory lock for its
/// lifetime; dropping releases it.
pub struct Persister {
    dir: PathBuf,
    _lock: StoreLock,
    keep: usize,
    fsync: bool,
}

impl Persister {
    /// Create the directory if needed and take exclusive ownership of it.
    pub fn open(dir: &Path, cfg: &TrackConfig) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create store dir {}", dir.display()))?;
        }
        let lock = StoreLock::acquire(dir, cfg.lock_stale_ms)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            keep: cfg.backup_keep,
            fsync: cfg.fsync,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read all partitions into one document, repairing what does not
    /// parse.
    pub fn load(&self) -> Result<TrackerState> {
        let projects: ProjectsFile = self.load_partition(Partition::Projects)?;
        let tasks: TasksFile = self.load_partition(Partition::Tasks)?;
        let memories: MemoriesFile = self.load_partition(Partition::Memories)?;
        let meta: MetaFile = self.load_partition(Partition::Meta)?;

        Ok(TrackerState {
            projects: projects.projects,
            tasks: tasks.tasks,
            memories: memories.memories,
            meta: meta.meta,
        })
    }

    fn load_partition<T: DeserializeOwned + Default>(&self, part: Partition) -> Result<T> {
        let path = self.dir.join(part.file_name());
        if !path.exists() {
            return Ok(T::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read partition {}", path.display()))?;
        match serde_yaml::from_str::<T>(&text) {
            Ok(v) => Ok(v),
            Err(e) => {
                // Structural self-healing: substitute schema defaults
                // instead of failing the whole load.
                warn!(
                    "partition {} failed schema validation, repaired to defaults: {e}",
                    path.display()
                );
                metrics::record_load_repair();
                Ok(T::default())
            }
        }
    }

    /// Encode the partitions named in `changed` (plus meta, always).
    /// An encode failure surfaces as `StoreError::Serialization` and
    /// happens strictly before any canonical or on-disk mutation.
    pub fn prepare(&self, state: &TrackerState, changed: ChangedParts) -> Result<SaveBatch> {
        let mut entries = Vec::new();

        if changed.projects {
            let doc = ProjectsRef {
                projects: &state.projects,
            };
            entries.push((Partition::Projects, encode(Partition::Projects, &doc)?));
        }
        if changed.tasks {
            let doc = TasksRef {
                tasks: &state.tasks,
            };
            entries.push((Partition::Tasks, encode(Partition::Tasks, &doc)?));
        }
        if changed.memories {
            let doc = MemoriesRef {
                memories: &state.memories,
            };
            entries.push((Partition::Memories, encode(Partition::Memories, &doc)?));
        }
        // Meta rides along with every save: commit stamps
        // meta.updated_at, so it has always changed.
        let doc = MetaRef { meta: &state.meta };
        entries.push((Partition::Meta, encode(Partition::Meta, &doc)?));

        Ok(SaveBatch { entries })
    }

    /// Rotate backups and write each prepared partition atomically.
    pub fn apply(&mut self, batch: SaveBatch) -> Result<()> {
        for (part, bytes) in batch.entries {
            let path = self.dir.join(part.file_name());
            rotate_backups(&path, self.keep)?;
            atomic_write(&path, &bytes, self.fsync)?;
            metrics::record_partition_written();
            debug!("wrote partition {}", path.display());
        }
        Ok(())
    }

    /// Full flush of every partition (shutdown path).
    pub fn save_full(&mut self, state: &TrackerState) -> Result<()> {
        let batch = self.prepare(state, ChangedParts::ALL)?;
        self.apply(batch)
    }
}

fn encode<T: Serialize>(part: Partition, doc: &T) -> Result<Vec<u8>> {
    let text = serde_yaml::to_string(doc).map_err(|e| {
        StoreError::Serialization(format!("encode partition {}: {e}", part.file_name()))
    })?;
    Ok(text.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_dir(prefix: &str) -> PathBuf {
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "tdb-persist-{}-{}-{}",
            prefix,
            std::process::id(),
            t
        ))
    }

    fn sample_state() -> TrackerState {
        let mut st = TrackerState::new();
        st.projects.push(Project {
            id: "p1".into(),
            name: "alpha".into(),
            description: "first".into(),
            status: Default::default(),
            created_at: 10,
            updated_at: 10,
        });
        st.tasks.push(Task {
            id: "t1".into(),
            project_id: "p1".into(),
            parent_id: None,
            title: "build".into(),
            details: String::new(),
            status: Default::default(),
            created_at: 11,
            updated_at: 11,
        });
        st.meta.updated_at = 12;
        st.meta.session_count = 1;
        st
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = unique_dir("roundtrip");
        let cfg = TrackConfig::default();
        let state = sample_state();

        {
            let mut p = Persister::open(&dir, &cfg).unwrap();
            let batch = p.prepare(&state, ChangedParts::ALL).unwrap();
            p.apply(batch).unwrap();
        }

        let p = Persister::open(&dir, &cfg).unwrap();
        let loaded = p.load().unwrap();
        assert_eq!(loaded, state);
        drop(p);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_partitions_default_to_empty() {
        let dir = unique_dir("missing");
        let cfg = TrackConfig::default();
        let p = Persister::open(&dir, &cfg).unwrap();
        let loaded = p.load().unwrap();
        assert_eq!(loaded.counts(), (0, 0, 0));
        assert_eq!(loaded.meta.session_count, 0);
        drop(p);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_partition_is_repaired_not_fatal() {
        let dir = unique_dir("repair");
        let cfg = TrackConfig::default();
        {
            let mut p = Persister::open(&dir, &cfg).unwrap();
            p.save_full(&sample_state()).unwrap();
        }
        fs::write(dir.join(TASKS_FILE), "tasks: 42\n").unwrap();

        let p = Persister::open(&dir, &cfg).unwrap();
        let loaded = p.load().unwrap();
        assert!(loaded.tasks.is_empty(), "invalid array repaired to default");
        assert_eq!(loaded.projects.len(), 1, "other partitions unaffected");
        drop(p);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn scoped_save_writes_named_partitions_plus_meta() {
        let dir = unique_dir("scoped");
        let cfg = TrackConfig::default();
        let mut p = Persister::open(&dir, &cfg).unwrap();
        let state = sample_state();

        let batch = p.prepare(&state, ChangedParts::tasks()).unwrap();
        let parts: Vec<Partition> = batch.partitions().collect();
        assert_eq!(parts, vec![Partition::Tasks, Partition::Meta]);

        p.apply(batch).unwrap();
        assert!(dir.join(TASKS_FILE).exists());
        assert!(dir.join(META_FILE).exists());
        assert!(!dir.join(PROJECTS_FILE).exists());
        assert!(!dir.join(MEMORIES_FILE).exists());
        drop(p);
        let _ = fs::remove_dir_all(&dir);
    }
}
