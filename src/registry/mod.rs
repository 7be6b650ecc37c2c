//! In-process task registry
//!
//! Holds the status record of every submitted job, keyed by task id. One
//! registry is created at process start and shared (behind an `Arc`) by the
//! HTTP handlers, which only read it, and by the job runners, which each write
//! the single task they own.
//!
//! ## Lifecycle
//!
//! ```text
//! Processing ──► Downloading ──► Completed
//!     │               │
//!     ├───────────────┴────────► Failed
//!     └──────────────────────────► Completed   (tag-only jobs)
//! ```
//!
//! Terminal states are final: [`TaskRegistry::set`] rejects any transition out
//! of `Completed` or `Failed`. Entries are never evicted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clipscout::registry::{TaskRegistry, TaskStatus};
//!
//! let registry = TaskRegistry::new();
//! let id = registry.create().await;
//! registry.set(&id, TaskStatus::Downloading).await?;
//! let task = registry.get(&id).await;
//! ```

pub mod error;
pub mod state;
pub mod store;

pub use error::{RegistryError, Result};
pub use state::{Task, TaskOutput, TaskStatus};
pub use store::TaskRegistry;
