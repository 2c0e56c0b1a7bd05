//! Rotating backup generations for partition files.
//!
//! Before a partition is overwritten, existing generations shift
//! (.backup.1 -> .backup.2 -> ... up to K, oldest dropped) and the
//! pre-write content becomes the new .backup.1. Rotation renames only;
//! the new canonical content lands afterwards via tmp+rename.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics;

/// `<file>.backup.<gen>` next to the partition file.
pub fn backup_path(path: &Path, gen: usize) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(format!(".backup.{gen}"));
    PathBuf::from(os)
}

/// Shift existing generations and move the current file to .backup.1.
/// No-op when rotation is disabled (keep = 0) or the file does not exist
/// yet (first write of this partition).
pub fn rotate_backups(path: &Path, keep: usize) -> Result<()> {
    if keep == 0 || !path.exists() {
        return Ok(());
    }

    // Oldest generation falls off the end.
    let _ = fs::remove_file(backup_path(path, keep));
    for gen in (1..keep).rev() {
        let from = backup_path(path, gen);
        if from.exists() {
            let to = backup_path(path, gen + 1);
            fs::rename(&from, &to)
                .with_context(|| format!("rotate {} -> {}", from.display(), to.display()))?;
        }
    }

    let first = backup_path(path, 1);
    fs::rename(path, &first)
        .with_context(|| format!("rotate {} -> {}", path.display(), first.display()))?;
    metrics::record_backup_rotated();
    Ok(())
}

/// Existing backup generations of a partition, newest first.
pub fn list_backups(path: &Path, keep: usize) -> Vec<PathBuf> {
    (1..=keep.max(1))
        .map(|gen| backup_path(path, gen))
        .filter(|p| p.exists())
        .collect()
}
