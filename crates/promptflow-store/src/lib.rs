//! # promptflow-store
//!
//! Persistence for PromptFlow.
//!
//! SQLite (WAL, versioned migrations) holds user accounts and generated
//! workflows. Workflow access goes through the [`WorkflowRepository`]
//! trait so callers can swap in [`MemoryWorkflowStore`] when no database
//! file is configured.
//!
//! ## Quick start
//!
//! ```ignore
//! use promptflow_store::{Database, UserStore, WorkflowStore};
//!
//! let db = Database::open_and_migrate("data/promptflow.db").await?;
//! let users = UserStore::new(db.clone());
//! let workflows = WorkflowStore::new(db);
//! ```

pub mod db;
pub mod error;
pub mod memory_store;
pub mod migration;
pub mod repository;
pub mod user_store;
pub mod workflow_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use memory_store::MemoryWorkflowStore;
pub use repository::{NewWorkflow, StoredWorkflow, WorkflowRepository, WorkflowUpdate};
pub use user_store::{User, UserStore};
pub use workflow_store::WorkflowStore;
