#![allow(non_snake_case)]

// Leaf modules
pub mod config;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod util;

// Core pipeline
pub mod snapshot;
pub mod validate;

// Persistence (lock, partitions, backups)
pub mod lock;
pub mod persist;

// The store itself (serializer + commit) and the domain helpers on top
pub mod ops;
pub mod store; // src/store/{mod,core,open,submit}.rs

// Convenience re-exports
pub use config::{StoreBuilder, TrackConfig};
pub use errors::StoreError;
pub use model::{
    ChangedParts, Memory, Meta, Outcome, Project, ProjectStatus, Task, TaskStatus, TrackerState,
    SCHEMA_VERSION,
};
pub use store::Store;
