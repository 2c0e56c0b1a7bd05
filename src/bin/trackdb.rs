//! trackdb — operator CLI over the embedded store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use TrackDB::ops;
use TrackDB::persist::{self, backup::list_backups};
use TrackDB::Store;

#[derive(Parser)]
#[command(
    name = "trackdb",
    version,
    about = "Project/task/memory tracker store (split YAML partitions, rotating backups)"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create (or touch) a store directory and print its state.
    Init { path: PathBuf },

    /// Show counts and meta for a store directory.
    Status {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Create a project.
    AddProject {
        path: PathBuf,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Create a task inside a project.
    AddTask {
        path: PathBuf,
        project_id: String,
        title: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value = "")]
        details: String,
    },

    /// Record a memory, optionally attached to a project and/or task.
    AddMemory {
        path: PathBuf,
        content: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        tag: Vec<String>,
    },

    /// List existing backup generations per partition.
    Backups { path: PathBuf },
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Init { path } => {
            let store = Store::open(&path)?;
            let st = store.state();
            println!(
                "initialized {} (session {})",
                path.display(),
                st.meta.session_count
            );
            Ok(())
        }

        Cmd::Status { path, json } => {
            let store = Store::open(&path)?;
            let st = store.state();
            let (projects, tasks, memories) = st.counts();
            if json {
                let out = serde_json::json!({
                    "path": path.display().to_string(),
                    "projects": projects,
                    "tasks": tasks,
                    "memories": memories,
                    "schema_version": st.meta.schema_version,
                    "session_count": st.meta.session_count,
                    "updated_at": st.meta.updated_at,
                    "current_project_id": st.meta.current_project_id,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("store:           {}", path.display());
                println!("projects:        {projects}");
                println!("tasks:           {tasks}");
                println!("memories:        {memories}");
                println!("schema_version:  {}", st.meta.schema_version);
                println!("session_count:   {}", st.meta.session_count);
                println!("updated_at:      {}", st.meta.updated_at);
                println!(
                    "current_project: {}",
                    st.meta.current_project_id.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }

        Cmd::AddProject {
            path,
            name,
            description,
        } => {
            let store = Store::open(&path)?;
            let p = store.submit(ops::create_project(name, description))?;
            println!("{}", p.id);
            Ok(())
        }

        Cmd::AddTask {
            path,
            project_id,
            title,
            parent,
            details,
        } => {
            let store = Store::open(&path)?;
            let t = store.submit(ops::create_task(project_id, parent, title, details))?;
            println!("{}", t.id);
            Ok(())
        }

        Cmd::AddMemory {
            path,
            content,
            project,
            task,
            tag,
        } => {
            let store = Store::open(&path)?;
            let m = store.submit(ops::add_memory(content, project, task, tag))?;
            println!("{}", m.id);
            Ok(())
        }

        Cmd::Backups { path } => {
            let store = Store::open(&path)?;
            let keep = store.config().backup_keep;
            for file in [
                persist::PROJECTS_FILE,
                persist::TASKS_FILE,
                persist::MEMORIES_FILE,
                persist::META_FILE,
            ] {
                let backups = list_backups(&path.join(file), keep);
                println!("{file}: {} generation(s)", backups.len());
                for b in backups {
                    println!("  {}", b.display());
                }
            }
            Ok(())
        }
    }
}
