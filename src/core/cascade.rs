//! core::cascade
//!
//! The ordered branch sequence a merge is forwarded through.
//!
//! # Ordering
//!
//! [`build_cascade`] classifies branches against [`CascadeOptions`]:
//!
//! 1. the development branch (exact name) comes first, when present
//! 2. release branches (name starts with the release prefix) follow, in
//!    ascending version order of the text after the prefix
//! 3. everything is dropped up to and including the start branch, when the
//!    start branch is part of the sequence
//! 4. the stable branch is always the last element, exactly once
//!
//! Anything else is ignored. The function is pure: the same branch set and
//! options always give the same sequence, whatever order the branches were
//! enumerated in.
//!
//! # Example
//!
//! ```
//! use cascade_merge::core::cascade::build_cascade;
//! use cascade_merge::core::types::{BranchName, CascadeOptions};
//!
//! let names = ["master", "release/1.2", "develop", "release/1.0"];
//! let branches = names.iter().map(|n| BranchName::new(*n).unwrap());
//! let start = BranchName::new("release/1.0").unwrap();
//!
//! let cascade = build_cascade(branches, &CascadeOptions::default(), &start);
//! assert_eq!(cascade.names(), vec!["release/1.2", "master"]);
//! ```

use std::collections::BTreeSet;
use std::iter::FusedIterator;

use tracing::debug;

use super::types::{BranchName, CascadeOptions};
use super::version::compare_versions;

/// Ordered branch names with a forward-only cursor.
///
/// `next()` hands out each remaining branch once; after the end it keeps
/// returning `None`. Rebuild the cascade to start over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cascade {
    branches: Vec<BranchName>,
    current: usize,
}

impl Cascade {
    /// An empty cascade.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch at the end. Duplicates are kept.
    pub fn append(&mut self, branch: BranchName) {
        self.branches.push(branch);
    }

    /// Drop everything up to and including `start`.
    ///
    /// When `start` is not part of the sequence nothing is dropped. Only the
    /// first occurrence counts. The cursor is reset to the new first element.
    pub fn truncate_from(&mut self, start: &BranchName) {
        if let Some(index) = self.branches.iter().position(|b| b == start) {
            self.branches.drain(..=index);
        }
        self.current = 0;
    }

    /// Make `branch` the final element, removing any earlier occurrence.
    pub fn place_last(&mut self, branch: BranchName) {
        self.branches.retain(|b| *b != branch);
        self.branches.push(branch);
    }

    /// All branches, including the ones already handed out.
    pub fn branches(&self) -> &[BranchName] {
        &self.branches
    }

    /// All branch names as string slices.
    pub fn names(&self) -> Vec<&str> {
        self.branches.iter().map(BranchName::as_str).collect()
    }

    /// Branches not yet returned by `next()`.
    pub fn remaining(&self) -> &[BranchName] {
        &self.branches[self.current.min(self.branches.len())..]
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl Iterator for Cascade {
    type Item = BranchName;

    fn next(&mut self) -> Option<Self::Item> {
        let branch = self.branches.get(self.current)?.clone();
        self.current += 1;
        Some(branch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining().len();
        (n, Some(n))
    }
}

impl FusedIterator for Cascade {}

impl std::fmt::Display for Cascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.names().join(" -> "))
    }
}

/// Order `branches` into a cascade starting right after `start`.
///
/// `branches` are short names (remote prefix already stripped); repeated
/// names are collapsed.
pub fn build_cascade(
    branches: impl IntoIterator<Item = BranchName>,
    options: &CascadeOptions,
    start: &BranchName,
) -> Cascade {
    let unique: BTreeSet<BranchName> = branches.into_iter().collect();

    let mut development = None;
    let mut releases = Vec::new();
    for branch in unique {
        if branch.as_str() == options.development_name {
            development = Some(branch);
        } else if branch.as_str().starts_with(&options.release_prefix) {
            releases.push(branch);
        }
    }

    // Stable sort: equal versions keep name order from the BTreeSet.
    releases.sort_by(|a, b| {
        compare_versions(
            release_version(a, &options.release_prefix),
            release_version(b, &options.release_prefix),
        )
    });

    let mut cascade = Cascade::new();
    if let Some(development) = development {
        cascade.append(development);
    }
    for release in releases {
        cascade.append(release);
    }
    debug!(cascade = %cascade, start = %start, "cascade before truncation");

    cascade.truncate_from(start);

    match BranchName::new(options.stable_name.as_str()) {
        Ok(stable) => cascade.place_last(stable),
        Err(e) => debug!(error = %e, "stable branch name is not a valid branch, not appended"),
    }

    cascade
}

fn release_version<'a>(branch: &'a BranchName, prefix: &str) -> &'a str {
    branch.as_str().strip_prefix(prefix).unwrap_or(branch.as_str())
}
