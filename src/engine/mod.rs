//! engine
//!
//! Orchestrates one cascade run end to end.
//!
//! # Architecture
//!
//! The engine drives the repository client through a fixed sequence and
//! turns every client error into a structured [`CascadeFailure`]:
//!
//! 1. **Prepare**: remove local branches, fetch, build the cascade, check
//!    out and reset the trigger branch
//! 2. **Hop**: for each target, check out, reset, merge the previous
//!    branch in and push
//!
//! # Invariants
//!
//! - At most one run touches a working copy at a time (enforced by the
//!   worker, which owns the only runner)
//! - A run never panics and never retries; the outcome is always a value
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::engine::CascadeRunner;
//!
//! match CascadeRunner::new(&git).run(&trigger, &options) {
//!     Ok(report) => println!("{} hops", report.hops.len()),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! ```

pub mod report;
pub mod runner;

pub use report::{CascadeFailure, CascadeReport, CascadeStep, Hop, HopOutcome};
pub use runner::CascadeRunner;
