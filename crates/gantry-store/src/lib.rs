//! Persistence for gantry.
//!
//! Runs own their jobs: both are written in one transaction and jobs are
//! removed with their run. Per-repository actions settings (currently the
//! set of disabled workflows) live alongside them.
//!
//! ```text
//! RunStorage (trait)      - run/job/settings operations
//!     └── SqliteStore     - SQLite with embedded migrations
//!     └── MockRunStorage  - in-memory, for tests
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod sqlite;
pub mod storage;

pub use config::ActionsConfig;
pub use error::{Result, StoreError};
pub use mock::MockRunStorage;
pub use sqlite::SqliteStore;
pub use storage::{RunFilter, RunStorage, initial_job_status};
