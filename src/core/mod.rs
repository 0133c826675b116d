//! core
//!
//! Core domain types and pure cascade logic.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, BranchRef, RepoId, CascadeOptions
//! - [`version`] - Dotted version comparator
//! - [`cascade`] - Cascade ordering and iteration
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Nothing in this module touches a repository or the network
//! - Ordering is deterministic for a given branch set and options

pub mod cascade;
pub mod config;
pub mod types;
pub mod version;
