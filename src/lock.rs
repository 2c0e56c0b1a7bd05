//! File-based locking for single-writer safety of a persisted store
//! directory.
//!
//! Two layers on the same sentinel file (<dir>/store.lock):
//! - an fs2 advisory lock held for the lifetime of the guard — settles
//!   same-host races at the OS level;
//! - a JSON descriptor {pid, timestamp, token, hostname} — human-readable
//!   ownership plus staleness detection across hosts where the advisory
//!   lock does not travel.
//!
//! Staleness: a descriptor is stale when its age exceeds the configured
//! timeout, or when it names a pid on this host that is no longer alive.
//! A stale descriptor is reclaimed; a live non-stale one fails acquisition
//! with `StoreError::LockAcquisition`.
//!
//! Lock is released on Drop (descriptor removed, advisory lock dropped).

use anyhow::{Context, Result};
use fs2::FileExt;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::errors::StoreError;
use crate::metrics;
use crate::util::now_millis;

pub const LOCK_FILE: &str = "store.lock";

/// On-disk lock descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockToken {
    pub pid: u32,
    /// Acquisition time, epoch milliseconds.
    pub timestamp: u64,
    /// Random discriminator so a pid reuse never looks like our own lock.
    pub token: u64,
    pub hostname: String,
}

impl LockToken {
    fn fresh() -> Self {
        Self {
            pid: std::process::id(),
            timestamp: now_millis(),
            token: rand::random::<u64>(),
            hostname: local_hostname(),
        }
    }

    pub fn age_ms(&self) -> u64 {
        now_millis().saturating_sub(self.timestamp)
    }

    /// Stale = older than the timeout, or owned by a dead pid on this host.
    /// Liveness is only consulted for descriptors written on this host;
    /// a foreign hostname falls back to the age check alone.
    pub fn is_stale(&self, stale_after_ms: u64) -> bool {
        if self.age_ms() > stale_after_ms {
            return true;
        }
        if self.hostname == local_hostname() {
            return !process_alive(self.pid);
        }
        false
    }
}

/// Held lock on a store directory. Dropping releases both layers.
#[derive(Debug)]
pub struct StoreLock {
    file: std::fs::File,
    path: PathBuf,
    token: LockToken,
}

impl StoreLock {
    /// Acquire the directory lock, reclaiming a stale descriptor if one is
    /// present. Fails with `StoreError::LockAcquisition` when a live,
    /// non-stale owner holds the store.
    pub fn acquire(dir: &Path, stale_after_ms: u64) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("open lock file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            let holder = describe_holder(&mut file);
            return Err(StoreError::LockAcquisition(format!(
                "{} is held by {}",
                path.display(),
                holder
            ))
            .into());
        }

        // We hold the advisory lock; the descriptor decides whether a
        // previous owner (possibly on another host) is still considered
        // alive.
        if let Some(existing) = read_token(&mut file) {
            if !existing.is_stale(stale_after_ms) {
                let msg = format!(
                    "{} is held by pid {} on {} (age {} ms)",
                    path.display(),
                    existing.pid,
                    existing.hostname,
                    existing.age_ms()
                );
                let _ = FileExt::unlock(&file);
                return Err(StoreError::LockAcquisition(msg).into());
            }
            warn!(
                "reclaiming stale lock {} (pid {} on {}, age {} ms)",
                path.display(),
                existing.pid,
                existing.hostname,
                existing.age_ms()
            );
            metrics::record_lock_reclaimed();
        }

        let token = LockToken::fresh();
        write_token(&mut file, &token)
            .with_context(|| format!("write lock descriptor {}", path.display()))?;

        Ok(Self { file, path, token })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> &LockToken {
        &self.token
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Descriptor removal and unlock errors on drop are ignored
        // deliberately.
        let _ = fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
    }
}

fn read_token(file: &mut std::fs::File) -> Option<LockToken> {
    let mut buf = String::new();
    if file.seek(SeekFrom::Start(0)).is_err() || file.read_to_string(&mut buf).is_err() {
        return None;
    }
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<LockToken>(trimmed) {
        Ok(tok) => Some(tok),
        Err(e) => {
            warn!("unreadable lock descriptor (treated as stale): {e}");
            None
        }
    }
}

fn write_token(file: &mut std::fs::File, token: &LockToken) -> Result<()> {
    let bytes = serde_json::to_vec(token).context("encode lock descriptor")?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

fn describe_holder(file: &mut std::fs::File) -> String {
    match read_token(file) {
        Some(tok) => format!(
            "pid {} on {} (age {} ms)",
            tok.pid,
            tok.hostname,
            tok.age_ms()
        ),
        None => "another process (no descriptor)".to_string(),
    }
}

fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}

fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::now_millis;

    fn unique_dir(prefix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tdb-lock-{}-{}-{}",
            prefix,
            std::process::id(),
            now_millis()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn descriptor_roundtrip() {
        let tok = LockToken::fresh();
        let json = serde_json::to_string(&tok).unwrap();
        let back: LockToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pid, tok.pid);
        assert_eq!(back.token, tok.token);
        assert_eq!(back.hostname, tok.hostname);
    }

    #[test]
    fn own_pid_is_alive() {
        assert!(process_alive(std::process::id()));
    }

    #[test]
    fn aged_descriptor_is_stale() {
        let mut tok = LockToken::fresh();
        tok.timestamp = now_millis().saturating_sub(60_000);
        assert!(tok.is_stale(30_000));
        // fresh one with a live pid is not
        assert!(!LockToken::fresh().is_stale(30_000));
    }

    #[test]
    fn acquire_release_reacquire() {
        let dir = unique_dir("cycle");
        {
            let lock = StoreLock::acquire(&dir, 30_000).unwrap();
            assert!(lock.path().exists());
        }
        // released on drop: second acquisition must succeed
        let lock = StoreLock::acquire(&dir, 30_000).unwrap();
        assert_eq!(lock.token().pid, std::process::id());
        drop(lock);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn live_descriptor_refuses_acquisition() {
        let dir = unique_dir("live");
        // forge a descriptor for this (live) process without holding the
        // advisory lock
        let tok = LockToken::fresh();
        fs::write(dir.join(LOCK_FILE), serde_json::to_vec(&tok).unwrap()).unwrap();

        let err = StoreLock::acquire(&dir, 30_000).unwrap_err();
        assert!(matches!(
            err.downcast::<StoreError>().unwrap(),
            StoreError::LockAcquisition(_)
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
