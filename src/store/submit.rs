//! store/submit — the operation serializer and commit pipeline.
//!
//! One worker thread owns the mutation side of the store and drains a FIFO
//! channel: operations run one at a time, in submission order, regardless
//! of how many threads submit concurrently. Each operation gets a fresh
//! working snapshot; on success + `commit = true` the pipeline is
//!
//!   validate -> stamp meta -> encode changed partitions -> swap pointer
//!   -> write partitions
//!
//! Encoding precedes the swap so a serialization failure rejects strictly
//! pre-commit. A failed operation (thrown error or validator rejection)
//! leaves canonical state untouched and never poisons the queue — the
//! worker just picks up the next message.
//!
//! Head-of-line blocking is accepted: an operation doing slow I/O holds
//! its queue slot, trading throughput for strict consistency. There is no
//! operation timeout or cancellation.

use anyhow::{anyhow, Context, Result};
use log::{debug, error};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crate::metrics;
use crate::model::{Outcome, TrackerState};
use crate::persist::Persister;
use crate::snapshot::snapshot;
use crate::util::now_secs;
use crate::validate::validate;

use super::core::{Shared, Store};

pub(crate) type Job = Box<dyn FnOnce(&mut Worker) + Send>;

pub(crate) enum Msg {
    Op(Job),
    Shutdown,
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    persister: Option<Persister>,
    completed: u64,
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>, persister: Option<Persister>) -> Self {
        Self {
            shared,
            persister,
            completed: 0,
        }
    }

    pub(crate) fn run_loop(mut self, rx: Receiver<Msg>) {
        while let Ok(msg) = rx.recv() {
            match msg {
                Msg::Op(job) => {
                    job(&mut self);
                    self.completed += 1;
                    let every = self.shared.cfg.hygiene_every;
                    if every > 0 && self.completed % every == 0 {
                        self.hygiene();
                    }
                }
                Msg::Shutdown => break,
            }
        }
        self.shutdown();
    }

    /// Run one operation against a fresh snapshot and commit if asked to.
    pub(crate) fn execute<R>(
        &mut self,
        op: impl FnOnce(&mut TrackerState) -> Result<Outcome<R>>,
    ) -> Result<R> {
        let current = self.shared.current();
        let mut snap = snapshot(&current)?;

        let outcome = match op(&mut snap) {
            Ok(o) => o,
            Err(e) => {
                metrics::record_op_rejected();
                return Err(e);
            }
        };

        if !outcome.commit {
            return Ok(outcome.value);
        }

        if let Err(e) = validate(&mut snap, outcome.changed, &self.shared.cfg) {
            metrics::record_op_rejected();
            return Err(e);
        }

        snap.meta.updated_at = now_secs();

        // Encode before the swap: a serialization failure must reject the
        // operation while canonical state is provably unchanged.
        let batch = match &self.persister {
            Some(p) => match p.prepare(&snap, outcome.changed) {
                Ok(b) => Some(b),
                Err(e) => {
                    metrics::record_op_rejected();
                    return Err(e);
                }
            },
            None => None,
        };

        self.shared.replace(Arc::new(snap));
        metrics::record_op_committed();

        if let (Some(p), Some(b)) = (self.persister.as_mut(), batch) {
            p.apply(b).context("persist committed state")?;
        }

        Ok(outcome.value)
    }

    /// Periodic reclamation hint; an optimization, never
    /// correctness-relevant.
    fn hygiene(&self) {
        debug!("hygiene after {} completed operations", self.completed);
        metrics::record_hygiene_run();
    }

    fn shutdown(&mut self) {
        if let Some(p) = self.persister.as_mut() {
            let state = self.shared.current();
            if let Err(e) = p.save_full(&state) {
                error!("final flush failed: {e:#}");
            }
        }
        // Dropping the persister releases the directory lock.
    }
}

impl Store {
    /// Submit an operation for serialized execution and wait for its
    /// result.
    ///
    /// The operation receives a fresh working snapshot; returning
    /// `Outcome::commit(..)` publishes the mutated snapshot atomically,
    /// `Outcome::read(..)` discards it. Errors reject only this
    /// submission — queued operations behind it proceed.
    pub fn submit<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut TrackerState) -> Result<Outcome<R>> + Send + 'static,
        R: Send + 'static,
    {
        metrics::record_op_submitted();

        let (reply_tx, reply_rx) = mpsc::channel();
        let job: Job = Box::new(move |worker| {
            // The caller may have hung up; delivery failure is theirs to
            // notice.
            let _ = reply_tx.send(worker.execute(op));
        });

        self.tx
            .send(Msg::Op(job))
            .map_err(|_| anyhow!("store serializer is shut down"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("store serializer dropped the operation"))?
    }
}
