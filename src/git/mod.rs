//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. Every clone, fetch, merge
//! and push flows through [`Git`]; no other module imports `git2`. All
//! transport goes through libgit2, the git CLI is never invoked.
//!
//! # Responsibilities
//!
//! - Opening an existing working copy or cloning a fresh one
//! - Remote branch enumeration and cascade ordering
//! - Branch sync: remove local branches, fetch, checkout, hard reset
//! - Merge with conflict detection and push with rejection detection
//! - Committing files (used by fixtures and manual repair)
//!
//! # Invariants
//!
//! - The working copy is disposable: checkout and reset always force
//! - Merge commits carry the source tip's author and a fixed message
//! - A failed merge leaves the repository mid-merge until the next checkout
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::git::{Git, MergeOutcome};
//!
//! let (git, _) = Git::open_or_clone(path, url, credentials, author)?;
//! git.fetch()?;
//! git.checkout(&target)?;
//! git.reset(&target)?;
//! if let MergeOutcome::Merged(_) = git.merge(&source, &target)? {
//!     git.push(&target)?;
//! }
//! ```

mod interface;

pub use interface::{Git, GitError, GitState, MergeOutcome, OpenMode, DEFAULT_REMOTE};
