//! git
//!
//! The stable facade over the git binding.
//!
//! # Architecture
//!
//! This module is the **only doorway** to `git2`. Every repository read
//! and write flows through [`RepositoryHandle`], and no other module may
//! import `git2`. The wrapped library's types never cross this boundary:
//! callers see [`FacadeError`], owned records and the strong types from
//! [`crate::core::types`].
//!
//! # Responsibilities
//!
//! - Opening, initializing and cloning repositories
//! - Reading HEAD, branches, tags and arbitrary references
//! - Lazy history traversal
//! - Staging, committing and tagging
//! - Tree-to-tree and working-tree diffs
//! - Reference updates with compare-and-swap semantics
//!
//! # Invariants
//!
//! - Public signatures never mention `git2`
//! - Every upstream failure maps to exactly one [`FacadeError`] variant
//! - Returned records own their data and outlive the handle
//!
//! # Example
//!
//! ```no_run
//! use stablegit::git::{ChangeKind, RepositoryHandle};
//! use std::path::Path;
//!
//! let repo = RepositoryHandle::open(Path::new("."))?;
//! for entry in repo.diff("HEAD~1", "HEAD")? {
//!     if entry.change == ChangeKind::Renamed {
//!         println!("{} -> {}", entry.old_path.unwrap_or_default(), entry.path);
//!     }
//! }
//! # Ok::<(), stablegit::git::FacadeError>(())
//! ```

mod adapt;
mod error;
mod history;
mod interface;
mod records;

pub use error::FacadeError;
pub use history::CommitHistory;
pub use interface::RepositoryHandle;
pub use records::{
    Author, BranchFilter, ChangeKind, CommitRecord, DiffEntry, ReferenceRecord, Signature,
    WorktreeStatus,
};
