//! Centralized configuration and builder for TrackDB.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - TrackConfig::from_env() reads TDB_* variables; the fluent builder
//!   overrides individual fields on top of that.
//!
//! Defaults:
//! - collection maxima: 1000 projects / 10000 tasks / 5000 memories
//! - backup_keep = 3 rotating generations per partition
//! - lock_stale_ms = 30000 (descriptor older than this is reclaimable)
//! - fsync = false (partitions are small; tmp+rename already bounds damage)
//! - hygiene_every = 64 completed operations between reclamation hints

use std::fmt;

#[derive(Clone, Debug)]
pub struct TrackConfig {
    /// Max number of projects. Env: TDB_MAX_PROJECTS (default 1000)
    pub max_projects: usize,

    /// Max number of tasks. Env: TDB_MAX_TASKS (default 10000)
    pub max_tasks: usize,

    /// Max number of memories. Env: TDB_MAX_MEMORIES (default 5000)
    pub max_memories: usize,

    /// Rotating backup generations kept per partition (0 disables).
    /// Env: TDB_BACKUP_KEEP (default 3)
    pub backup_keep: usize,

    /// Age in milliseconds past which a lock descriptor counts as stale.
    /// Env: TDB_LOCK_STALE_MS (default 30000)
    pub lock_stale_ms: u64,

    /// Whether to fsync partition writes (tmp file + parent directory).
    /// Env: TDB_FSYNC (default false; "1|true|on|yes" => true)
    pub fsync: bool,

    /// Completed operations between hygiene hook runs (0 disables).
    /// Env: TDB_HYGIENE_EVERY (default 64)
    pub hygiene_every: u64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            max_projects: 1000,
            max_tasks: 10_000,
            max_memories: 5000,
            backup_keep: 3,
            lock_stale_ms: 30_000,
            fsync: false,
            hygiene_every: 64,
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "on" || s == "yes"
    })
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl TrackConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(n) = env_parse("TDB_MAX_PROJECTS") {
            cfg.max_projects = n;
        }
        if let Some(n) = env_parse("TDB_MAX_TASKS") {
            cfg.max_tasks = n;
        }
        if let Some(n) = env_parse("TDB_MAX_MEMORIES") {
            cfg.max_memories = n;
        }
        if let Some(n) = env_parse("TDB_BACKUP_KEEP") {
            cfg.backup_keep = n;
        }
        if let Some(n) = env_parse("TDB_LOCK_STALE_MS") {
            cfg.lock_stale_ms = n;
        }
        if let Some(b) = env_bool("TDB_FSYNC") {
            cfg.fsync = b;
        }
        if let Some(n) = env_parse("TDB_HYGIENE_EVERY") {
            cfg.hygiene_every = n;
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_max_projects(mut self, n: usize) -> Self {
        self.max_projects = n;
        self
    }

    pub fn with_max_tasks(mut self, n: usize) -> Self {
        self.max_tasks = n;
        self
    }

    pub fn with_max_memories(mut self, n: usize) -> Self {
        self.max_memories = n;
        self
    }

    pub fn with_backup_keep(mut self, keep: usize) -> Self {
        self.backup_keep = keep;
        self
    }

    pub fn with_lock_stale_ms(mut self, ms: u64) -> Self {
        self.lock_stale_ms = ms;
        self
    }

    pub fn with_fsync(mut self, on: bool) -> Self {
        self.fsync = on;
        self
    }

    pub fn with_hygiene_every(mut self, n: u64) -> Self {
        self.hygiene_every = n;
        self
    }
}

impl fmt::Display for TrackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackConfig {{ \
             max_projects: {}, \
             max_tasks: {}, \
             max_memories: {}, \
             backup_keep: {}, \
             lock_stale_ms: {}, \
             fsync: {}, \
             hygiene_every: {} \
             }}",
            self.max_projects,
            self.max_tasks,
            self.max_memories,
            self.backup_keep,
            self.lock_stale_ms,
            self.fsync,
            self.hygiene_every,
        )
    }
}

/// Lightweight builder that produces a TrackConfig.
/// Store exposes `Store::builder()` returning this builder.
#[derive(Clone, Debug)]
pub struct StoreBuilder {
    cfg: TrackConfig,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        // Start from env to preserve operator overrides, then allow
        // programmatic ones on top.
        Self {
            cfg: TrackConfig::from_env(),
        }
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from clean defaults (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: TrackConfig::default(),
        }
    }

    pub fn max_projects(mut self, n: usize) -> Self {
        self.cfg.max_projects = n;
        self
    }

    pub fn max_tasks(mut self, n: usize) -> Self {
        self.cfg.max_tasks = n;
        self
    }

    pub fn max_memories(mut self, n: usize) -> Self {
        self.cfg.max_memories = n;
        self
    }

    pub fn backup_keep(mut self, keep: usize) -> Self {
        self.cfg.backup_keep = keep;
        self
    }

    pub fn lock_stale_ms(mut self, ms: u64) -> Self {
        self.cfg.lock_stale_ms = ms;
        self
    }

    pub fn fsync(mut self, on: bool) -> Self {
        self.cfg.fsync = on;
        self
    }

    pub fn hygiene_every(mut self, n: u64) -> Self {
        self.cfg.hygiene_every = n;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> TrackConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = StoreBuilder::from_default()
            .max_tasks(5)
            .backup_keep(1)
            .fsync(true)
            .build();
        assert_eq!(cfg.max_tasks, 5);
        assert_eq!(cfg.backup_keep, 1);
        assert!(cfg.fsync);
        // untouched fields keep defaults
        assert_eq!(cfg.max_projects, 1000);
    }
}
