//! Git access for gantry.
//!
//! Dispatch never talks to git directly; it goes through the
//! [`GitRepository`] trait so the orchestrator can run against an on-disk
//! repository ([`Git2Repository`]) or an in-memory fixture
//! ([`MemoryRepository`]).
//!
//! ```text
//! GitRepository (trait)      - tag/branch resolution, tree listing, blob reads
//!     └── Git2Repository     - libgit2-backed, for repositories on disk
//!     └── MemoryRepository   - in-memory, for tests and fixtures
//! ```

pub mod error;
pub mod git2_repo;
pub mod memory;
pub mod refs;
pub mod repository;

pub use error::{GitError, Result};
pub use git2_repo::Git2Repository;
pub use memory::MemoryRepository;
pub use refs::{RefKind, RefName};
pub use repository::{Commit, EntryKind, GitRepository, TreeEntry};
