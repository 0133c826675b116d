//! engine::report
//!
//! Result values of a cascade run.
//!
//! A run either produces a [`CascadeReport`] listing every hop it made, or a
//! [`CascadeFailure`] naming the step and branch pair it stopped at. Both are
//! plain values: nothing here holds a repository handle.

use std::fmt;

use crate::core::types::{BranchName, CommitId};
use crate::git::GitError;

/// The steps of a cascade run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStep {
    RemoveLocalBranches,
    Fetch,
    BuildCascade,
    Checkout,
    Reset,
    Merge,
    Push,
}

impl CascadeStep {
    /// Short lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStep::RemoveLocalBranches => "remove-local-branches",
            CascadeStep::Fetch => "fetch",
            CascadeStep::BuildCascade => "build-cascade",
            CascadeStep::Checkout => "checkout",
            CascadeStep::Reset => "reset",
            CascadeStep::Merge => "merge",
            CascadeStep::Push => "push",
        }
    }
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single hop did to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopOutcome {
    /// A merge commit was created and pushed.
    Merged { commit: CommitId },
    /// The target already contained the source.
    UpToDate,
}

/// One source to target step of a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub source: BranchName,
    pub target: BranchName,
    pub outcome: HopOutcome,
}

/// A cascade that ran to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// The branch whose merge started the run.
    pub trigger: BranchName,
    /// Hops in the order they were made.
    pub hops: Vec<Hop>,
}

impl CascadeReport {
    /// Targets in hop order.
    pub fn targets(&self) -> Vec<&str> {
        self.hops.iter().map(|h| h.target.as_str()).collect()
    }

    /// Number of hops that created a merge commit.
    pub fn merged_count(&self) -> usize {
        self.hops
            .iter()
            .filter(|h| matches!(h.outcome, HopOutcome::Merged { .. }))
            .count()
    }
}

/// Where and why a cascade stopped.
///
/// `target` is `None` when the run failed while preparing, before any hop
/// began.
#[derive(Debug)]
pub struct CascadeFailure {
    pub step: CascadeStep,
    pub source: BranchName,
    pub target: Option<BranchName>,
    pub error: GitError,
}

impl CascadeFailure {
    /// Whether the failure is a merge conflict.
    pub fn is_conflict(&self) -> bool {
        self.error.is_conflict()
    }
}

impl fmt::Display for CascadeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(
                f,
                "cascade {} -> {} failed at {}: {}",
                self.source, target, self.step, self.error
            ),
            None => write!(
                f,
                "cascade from {} failed at {}: {}",
                self.source, self.step, self.error
            ),
        }
    }
}

impl std::error::Error for CascadeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
