//! stablegit - a stable facade over a native git binding
//!
//! Applications that talk to git through a native binding inherit its
//! churn: renamed methods, reshuffled error codes, borrowed objects that
//! dangle after the repository closes. `stablegit` puts a small, versioned
//! surface in front of [`git2`](https://docs.rs/git2) so that upgrading the
//! binding is a change to this crate only.
//!
//! # Architecture
//!
//! - [`core`] - Strong types and configuration, no git dependency
//! - [`git`] - The facade: repository handle, records, errors
//!
//! # Guarantees
//!
//! 1. No public signature names a `git2` type
//! 2. Errors form a closed set ([`git::FacadeError`])
//! 3. Records are owned values, valid after the handle is gone
//! 4. History is read lazily, one commit at a time

pub mod core;
pub mod git;
