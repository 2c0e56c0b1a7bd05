//! Randomized churn against a naive mirror model: counts must track
//! exactly and the final document must be referentially sound.

use anyhow::Result;

use TrackDB::ops;
use TrackDB::{Store, TrackConfig};

#[test]
fn random_ops_stay_consistent_with_model() -> Result<()> {
    let mut rng = oorandom::Rand32::new(0xC0FFEE);
    let store = Store::open_in_memory_with_config(TrackConfig::default())?;

    // mirror model
    let mut projects: Vec<String> = Vec::new();
    let mut tasks: Vec<(String, String)> = Vec::new(); // (task_id, project_id)
    let mut memories: usize = 0;

    for step in 0..300 {
        match rng.rand_range(0..100) {
            // create project (frequent)
            0..=29 => {
                let p = store.submit(ops::create_project(format!("proj-{step}"), ""))?;
                projects.push(p.id);
            }
            // create task under a random project
            30..=59 => {
                if projects.is_empty() {
                    continue;
                }
                let pid = projects[rng.rand_range(0..projects.len() as u32) as usize].clone();
                let t = store.submit(ops::create_task(
                    pid.clone(),
                    None,
                    format!("task-{step}"),
                    "",
                ))?;
                tasks.push((t.id, pid));
            }
            // add a memory, sometimes attached to a project
            60..=79 => {
                let attach = if !projects.is_empty() && rng.rand_range(0..2) == 0 {
                    Some(projects[rng.rand_range(0..projects.len() as u32) as usize].clone())
                } else {
                    None
                };
                store.submit(ops::add_memory(format!("note-{step}"), attach, None, vec![]))?;
                memories += 1;
            }
            // delete a random task
            80..=89 => {
                if tasks.is_empty() {
                    continue;
                }
                let idx = rng.rand_range(0..tasks.len() as u32) as usize;
                let (tid, _) = tasks.remove(idx);
                assert!(store.submit(ops::delete_task(tid))?);
            }
            // delete a random project (cascades to its tasks, detaches
            // memories)
            _ => {
                if projects.is_empty() {
                    continue;
                }
                let idx = rng.rand_range(0..projects.len() as u32) as usize;
                let pid = projects.remove(idx);
                tasks.retain(|(_, p)| *p != pid);
                assert!(store.submit(ops::delete_project(pid))?);
            }
        }
    }

    let st = store.state();
    assert_eq!(st.projects.len(), projects.len());
    assert_eq!(st.tasks.len(), tasks.len());
    assert_eq!(st.memories.len(), memories);

    // final document is referentially sound
    for task in &st.tasks {
        assert!(
            st.project(&task.project_id).is_some(),
            "task {} must resolve its project",
            task.id
        );
    }
    for mem in &st.memories {
        if let Some(pid) = &mem.project_id {
            assert!(st.project(pid).is_some());
        }
        if let Some(tid) = &mem.task_id {
            assert!(st.task(tid).is_some());
        }
    }

    Ok(())
}
