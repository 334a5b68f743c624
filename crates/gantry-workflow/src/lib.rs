//! Workflow discovery and job-graph parsing.
//!
//! Turns the workflow files found at a commit into an ordered list of
//! [`SingleWorkflow`]s, one per (matrix-expanded) job, ready to be expanded
//! into persisted jobs.
//!
//! # Example workflow
//!
//! ```yaml
//! name: build
//! run-name: Build ${{ github.ref_name }}
//! on:
//!   push:
//!   workflow_dispatch:
//!     inputs:
//!       env:
//!         type: choice
//!         options: [staging, production]
//!         default: staging
//! jobs:
//!   test:
//!     runs-on: ubuntu-latest
//!     strategy:
//!       matrix:
//!         rust: [stable, nightly]
//!     steps:
//!       - run: cargo test
//!   deploy:
//!     needs: test
//!     runs-on: ubuntu-latest
//!     steps:
//!       - run: ./deploy.sh
//! ```

pub mod context;
pub mod error;
pub mod expression;
pub mod loader;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod triggers;

pub use context::GitContext;
pub use error::{Result, WorkflowError};
pub use expression::{ExpressionResolver, has_expression, render_template};
pub use loader::{content_from_entry, find_workflow, is_workflow_file, list_workflows};
pub use model::{Job, Strategy, WorkflowDocument};
pub use parser::{SingleWorkflow, parse};
pub use triggers::{DispatchInput, InputDef, InputType, Triggers, WorkflowDispatch};
