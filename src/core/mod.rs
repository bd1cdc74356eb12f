//! core
//!
//! Domain types and configuration shared by the facade.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Nothing in `core` knows about the wrapped git binding
//! - Invalid identifiers cannot be constructed

pub mod config;
pub mod types;
