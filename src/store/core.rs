//! store/core — the Store handle and the shared canonical-state slot.
//!
//! The canonical document lives behind `RwLock<Arc<TrackerState>>`:
//! readers clone the Arc under a read guard and work on an immutable
//! published state; the worker replaces the Arc wholesale under the write
//! guard. A reader therefore observes either the fully-old or fully-new
//! document, never a mix — though two reads of its own may straddle a
//! commit (no read-snapshot isolation for readers).

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use crate::config::{StoreBuilder, TrackConfig};
use crate::model::TrackerState;

use super::submit::Msg;

pub(crate) struct Shared {
    pub(crate) canonical: RwLock<Arc<TrackerState>>,
    pub(crate) cfg: TrackConfig,
}

impl Shared {
    pub(crate) fn current(&self) -> Arc<TrackerState> {
        // Poisoning can only follow a panic elsewhere; the slot itself is
        // swapped atomically, so the value is always intact.
        self.canonical
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn replace(&self, next: Arc<TrackerState>) {
        *self.canonical.write().unwrap_or_else(|e| e.into_inner()) = next;
    }
}

/// Embedded tracker store: one canonical document, strictly serialized
/// mutations, optional durable persistence.
pub struct Store {
    pub(crate) shared: Arc<Shared>,
    pub(crate) tx: Sender<Msg>,
    pub(crate) worker: Option<JoinHandle<()>>,
    pub(crate) root: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Builder over `TrackConfig` (env-seeded).
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Current committed state. Cheap: clones an Arc, bypasses the
    /// serializer.
    pub fn state(&self) -> Arc<TrackerState> {
        self.shared.current()
    }

    pub fn config(&self) -> &TrackConfig {
        &self.shared.cfg
    }

    /// Store directory when persistence is enabled.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Ask the worker to flush and release the lock, then wait for it.
        let _ = self.tx.send(Msg::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
