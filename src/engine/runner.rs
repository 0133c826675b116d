//! engine::runner
//!
//! The single entry point for a cascade run.
//!
//! # Lifecycle
//!
//! ```text
//! RemoveLocalBranches -> Fetch -> BuildCascade -> Checkout(trigger) -> Reset(trigger)
//!     -> for each target: Checkout -> Reset -> Merge -> Push
//! ```
//!
//! Each target is reset against its own remote tip and merged from the
//! previous target (not from the trigger), so a change travels the chain
//! hop by hop exactly once.
//!
//! # Invariants
//!
//! - The first failing step ends the run; nothing after it executes
//! - A failure always names the source branch in flight, and the target
//!   once the hop loop has started
//! - Nothing is retried

use tracing::{debug, info, warn};

use super::report::{CascadeFailure, CascadeReport, CascadeStep, Hop, HopOutcome};
use crate::core::types::{BranchName, CascadeOptions};
use crate::git::{Git, GitError, MergeOutcome};

/// Runs cascades against one working copy.
#[derive(Debug)]
pub struct CascadeRunner<'a> {
    git: &'a Git,
}

impl<'a> CascadeRunner<'a> {
    pub fn new(git: &'a Git) -> Self {
        Self { git }
    }

    /// Cascade the tip of `trigger` forward through every later branch.
    ///
    /// # Errors
    ///
    /// Returns a [`CascadeFailure`] describing the first step that failed.
    /// The working copy is left as that step left it; the next run's
    /// checkout discards any merge in progress.
    pub fn run(
        &self,
        trigger: &BranchName,
        options: &CascadeOptions,
    ) -> Result<CascadeReport, CascadeFailure> {
        info!(trigger = %trigger, "starting cascade");

        let prepare = |step: CascadeStep| {
            move |error: GitError| CascadeFailure {
                step,
                source: trigger.clone(),
                target: None,
                error,
            }
        };

        self.git
            .remove_local_branches(&options.stable_name)
            .map_err(prepare(CascadeStep::RemoveLocalBranches))?;
        self.git.fetch().map_err(prepare(CascadeStep::Fetch))?;
        let cascade = self
            .git
            .build_cascade(options, trigger)
            .map_err(prepare(CascadeStep::BuildCascade))?;
        self.git
            .checkout(trigger)
            .map_err(prepare(CascadeStep::Checkout))?;
        self.git
            .reset(trigger)
            .map_err(prepare(CascadeStep::Reset))?;

        let mut source = trigger.clone();
        let mut hops = Vec::with_capacity(cascade.len());

        for target in cascade {
            let outcome = self.hop(&source, &target)?;
            match &outcome {
                HopOutcome::Merged { commit } => {
                    info!(source = %source, target = %target, commit = %commit.short(8), "hop merged");
                }
                HopOutcome::UpToDate => {
                    debug!(source = %source, target = %target, "hop up to date");
                }
            }
            hops.push(Hop {
                source: source.clone(),
                target: target.clone(),
                outcome,
            });
            source = target;
        }

        info!(trigger = %trigger, hops = hops.len(), "cascade complete");
        Ok(CascadeReport {
            trigger: trigger.clone(),
            hops,
        })
    }

    fn hop(&self, source: &BranchName, target: &BranchName) -> Result<HopOutcome, CascadeFailure> {
        let fail = |step: CascadeStep| {
            move |error: GitError| {
                warn!(source = %source, target = %target, step = %step, error = %error, "cascade stopped");
                CascadeFailure {
                    step,
                    source: source.clone(),
                    target: Some(target.clone()),
                    error,
                }
            }
        };

        self.git.checkout(target).map_err(fail(CascadeStep::Checkout))?;
        self.git.reset(target).map_err(fail(CascadeStep::Reset))?;

        match self
            .git
            .merge(source, target)
            .map_err(fail(CascadeStep::Merge))?
        {
            MergeOutcome::UpToDate => Ok(HopOutcome::UpToDate),
            MergeOutcome::Merged(commit) => {
                self.git.push(target).map_err(fail(CascadeStep::Push))?;
                Ok(HopOutcome::Merged { commit })
            }
        }
    }
}
