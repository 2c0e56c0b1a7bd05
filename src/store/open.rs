//! store/open — opening a Store (persistent or in-memory).
//!
//! Persistent open order matters: lock the directory first (via the
//! persister), then load partitions, then bump the session counter and
//! save meta before the serializer starts accepting operations.

use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread;

use crate::config::TrackConfig;
use crate::errors::StoreError;
use crate::model::{ChangedParts, TrackerState, SCHEMA_VERSION};
use crate::persist::Persister;
use crate::util::now_secs;

use super::core::{Shared, Store};
use super::submit::Worker;

impl Store {
    /// Open (or create) a persisted store directory with env-seeded
    /// config.
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with_config(dir, TrackConfig::from_env())
    }

    pub fn open_with_config(dir: &Path, cfg: TrackConfig) -> Result<Self> {
        let mut persister = Persister::open(dir, &cfg)?;
        let mut state = persister.load()?;

        if state.meta.schema_version != SCHEMA_VERSION {
            return Err(StoreError::Validation(format!(
                "unsupported schema version {} in {} (expected {})",
                state.meta.schema_version,
                dir.display(),
                SCHEMA_VERSION
            ))
            .into());
        }

        // One session per open; persisted right away so a crash still
        // accounts for it.
        state.meta.session_count += 1;
        state.meta.updated_at = now_secs();
        let batch = persister.prepare(&state, ChangedParts::meta())?;
        persister.apply(batch)?;

        info!(
            "opened store {} (session {}, {:?} entities)",
            dir.display(),
            state.meta.session_count,
            state.counts()
        );

        Self::start(cfg, state, Some(persister), Some(dir))
    }

    /// Ephemeral store: same pipeline, no disk, no lock.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_config(TrackConfig::from_env())
    }

    pub fn open_in_memory_with_config(cfg: TrackConfig) -> Result<Self> {
        Self::start(cfg, TrackerState::new(), None, None)
    }

    fn start(
        cfg: TrackConfig,
        state: TrackerState,
        persister: Option<Persister>,
        root: Option<&Path>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            canonical: RwLock::new(Arc::new(state)),
            cfg,
        });

        let (tx, rx) = mpsc::channel();
        let worker = Worker::new(shared.clone(), persister);
        let handle = thread::Builder::new()
            .name("trackdb-store".to_string())
            .spawn(move || worker.run_loop(rx))?;

        Ok(Self {
            shared,
            tx,
            worker: Some(handle),
            root: root.map(Path::to_path_buf),
        })
    }
}
