//! Lock protocol: stale descriptors are reclaimed on the first attempt,
//! live owners are refused, release makes the directory available again.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use TrackDB::lock::{LockToken, LOCK_FILE};
use TrackDB::{Store, StoreError, TrackConfig};

#[test]
fn stale_descriptor_is_reclaimed_first_try() -> Result<()> {
    let root = unique_root("stale");
    fs::create_dir_all(&root)?;

    // Forge a descriptor from a long-gone owner: nonexistent pid, ancient
    // timestamp (either condition alone marks it stale).
    let dead = LockToken {
        pid: 3_999_999_999,
        timestamp: 5,
        token: 42,
        hostname: "long-gone-host".into(),
    };
    fs::write(root.join(LOCK_FILE), serde_json::to_vec(&dead)?)?;

    let store = Store::open_with_config(&root, TrackConfig::default())?;
    assert_eq!(store.state().meta.session_count, 1);

    // the descriptor now names us
    let text = fs::read_to_string(root.join(LOCK_FILE))?;
    let tok: LockToken = serde_json::from_str(&text)?;
    assert_eq!(tok.pid, std::process::id());
    assert_ne!(tok.token, dead.token);

    drop(store);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn live_owner_refuses_second_acquisition() -> Result<()> {
    let root = unique_root("live");

    let first = Store::open_with_config(&root, TrackConfig::default())?;
    let err = Store::open_with_config(&root, TrackConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast::<StoreError>().unwrap(),
        StoreError::LockAcquisition(_)
    ));

    drop(first);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn release_on_drop_frees_the_directory() -> Result<()> {
    let root = unique_root("release");

    {
        let _store = Store::open_with_config(&root, TrackConfig::default())?;
        assert!(root.join(LOCK_FILE).exists());
    }
    assert!(
        !root.join(LOCK_FILE).exists(),
        "descriptor removed on release"
    );

    // immediate reacquisition succeeds
    let again = Store::open_with_config(&root, TrackConfig::default())?;
    assert_eq!(again.state().meta.session_count, 2);

    drop(again);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tdb-{}-{}-{}", prefix, pid, t))
}
