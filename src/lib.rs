//! Cascade Merge - forward-propagating merges across release branches
//!
//! When a pull request lands on a release branch, the change is merged
//! forward into every later release branch and finally into the stable
//! branch, one hop at a time. A hop that cannot merge cleanly is handed to
//! a human as a pull request.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, wires components)
//! - [`server`] - HTTP endpoint accepting webhooks
//! - [`worker`] - Bounded queue and the single event worker
//! - [`engine`] - One cascade run: prepare, then hop by hop
//! - [`core`] - Domain types, version ordering, cascade building, config
//! - [`git`] - Single interface for all Git operations
//! - [`forge`] - Abstraction for the hosting service (Bitbucket Cloud)
//!
//! # Correctness Invariants
//!
//! 1. At most one cascade runs at a time
//! 2. Every target is reset to its remote tip before it is merged into
//! 3. Conflicts are surfaced, never resolved automatically
//! 4. The stable branch is always the last hop

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod server;
pub mod worker;
