//! Rejected operations must leave canonical state untouched and must not
//! poison the queue.

use anyhow::{anyhow, Result};
use TrackDB::ops;
use TrackDB::{ChangedParts, Outcome, Store, StoreError, Task, TaskStatus, TrackConfig};

fn ghost_task(id: &str, project_id: &str) -> Task {
    Task {
        id: id.into(),
        project_id: project_id.into(),
        parent_id: None,
        title: id.into(),
        details: String::new(),
        status: TaskStatus::Todo,
        created_at: 1,
        updated_at: 1,
    }
}

#[test]
fn capacity_rejection_is_atomic() -> Result<()> {
    let cfg = TrackConfig::default().with_max_tasks(1);
    let store = Store::open_in_memory_with_config(cfg)?;

    let p = store.submit(ops::create_project("alpha", ""))?;
    store.submit(ops::create_task(p.id.clone(), None, "only", ""))?;
    assert_eq!(store.state().tasks.len(), 1);

    let err = store
        .submit(ops::create_task(p.id.clone(), None, "overflow", ""))
        .unwrap_err();
    match err.downcast::<StoreError>().unwrap() {
        StoreError::CapacityExceeded {
            collection, len, max, ..
        } => {
            assert_eq!(collection, "tasks");
            assert_eq!(len, 2);
            assert_eq!(max, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    // canonical count unchanged from before the rejected submission
    assert_eq!(store.state().tasks.len(), 1);
    Ok(())
}

#[test]
fn referential_rejection_is_atomic() -> Result<()> {
    let store = Store::open_in_memory_with_config(TrackConfig::default())?;

    let err = store
        .submit(|state| {
            state.tasks.push(ghost_task("t1", "no-such-project"));
            Ok(Outcome::commit((), ChangedParts::tasks()))
        })
        .unwrap_err();
    assert!(matches!(
        err.downcast::<StoreError>().unwrap(),
        StoreError::Validation(_)
    ));

    assert!(
        store.state().tasks.is_empty(),
        "no dangling task may survive the rejection"
    );
    Ok(())
}

#[test]
fn operation_error_propagates_without_commit() -> Result<()> {
    let store = Store::open_in_memory_with_config(TrackConfig::default())?;

    let err = store
        .submit(|state| -> Result<Outcome<()>> {
            state.projects.clear();
            Err(anyhow!("business rule says no"))
        })
        .unwrap_err();
    assert!(err.to_string().contains("business rule says no"));
    Ok(())
}

#[test]
fn errors_do_not_poison_the_queue() -> Result<()> {
    let store = Store::open_in_memory_with_config(TrackConfig::default())?;

    for round in 0..3 {
        let _ = store
            .submit(|state| {
                state.tasks.push(ghost_task("bad", "ghost"));
                Ok(Outcome::commit((), ChangedParts::tasks()))
            })
            .unwrap_err();

        // the serializer keeps going: the very next submission works
        let p = store.submit(ops::create_project(format!("p{round}"), ""))?;
        assert!(store.state().project(&p.id).is_some());
    }

    assert_eq!(store.state().projects.len(), 3);
    assert!(store.state().tasks.is_empty());
    Ok(())
}
