//! Lightweight global metrics for TrackDB.
//!
//! Thread-safe atomic counters for the store subsystems:
//! - operation serializer (submitted / committed / rejected)
//! - persistence (partition writes, backup rotations, load repairs)
//! - lock protocol (stale reclaims)
//! - hygiene hook runs

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Serializer -----
static OPS_SUBMITTED: AtomicU64 = AtomicU64::new(0);
static OPS_COMMITTED: AtomicU64 = AtomicU64::new(0);
static OPS_REJECTED: AtomicU64 = AtomicU64::new(0);

// ----- Persistence -----
static PARTITIONS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static BACKUPS_ROTATED: AtomicU64 = AtomicU64::new(0);
static LOAD_REPAIRS: AtomicU64 = AtomicU64::new(0);

// ----- Lock protocol -----
static LOCKS_RECLAIMED: AtomicU64 = AtomicU64::new(0);

// ----- Hygiene -----
static HYGIENE_RUNS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub ops_submitted: u64,
    pub ops_committed: u64,
    pub ops_rejected: u64,

    pub partitions_written: u64,
    pub backups_rotated: u64,
    pub load_repairs: u64,

    pub locks_reclaimed: u64,

    pub hygiene_runs: u64,
}

impl MetricsSnapshot {
    pub fn commit_ratio(&self) -> f64 {
        if self.ops_submitted == 0 {
            0.0
        } else {
            self.ops_committed as f64 / self.ops_submitted as f64
        }
    }
}

// ----- Recorders -----

pub fn record_op_submitted() {
    OPS_SUBMITTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_op_committed() {
    OPS_COMMITTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_op_rejected() {
    OPS_REJECTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_partition_written() {
    PARTITIONS_WRITTEN.fetch_add(1, Ordering::Relaxed);
}

pub fn record_backup_rotated() {
    BACKUPS_ROTATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_load_repair() {
    LOAD_REPAIRS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_lock_reclaimed() {
    LOCKS_RECLAIMED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_hygiene_run() {
    HYGIENE_RUNS.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        ops_submitted: OPS_SUBMITTED.load(Ordering::Relaxed),
        ops_committed: OPS_COMMITTED.load(Ordering::Relaxed),
        ops_rejected: OPS_REJECTED.load(Ordering::Relaxed),

        partitions_written: PARTITIONS_WRITTEN.load(Ordering::Relaxed),
        backups_rotated: BACKUPS_ROTATED.load(Ordering::Relaxed),
        load_repairs: LOAD_REPAIRS.load(Ordering::Relaxed),

        locks_reclaimed: LOCKS_RECLAIMED.load(Ordering::Relaxed),

        hygiene_runs: HYGIENE_RUNS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    OPS_SUBMITTED.store(0, Ordering::Relaxed);
    OPS_COMMITTED.store(0, Ordering::Relaxed);
    OPS_REJECTED.store(0, Ordering::Relaxed);

    PARTITIONS_WRITTEN.store(0, Ordering::Relaxed);
    BACKUPS_ROTATED.store(0, Ordering::Relaxed);
    LOAD_REPAIRS.store(0, Ordering::Relaxed);

    LOCKS_RECLAIMED.store(0, Ordering::Relaxed);

    HYGIENE_RUNS.store(0, Ordering::Relaxed);
}
