//! git::interface
//!
//! Repository client implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations. The
//! [`Git`] struct owns one local working copy bound to one remote and one
//! credential pair, and exposes the branch-sync primitives a cascade needs:
//! remove local branches, fetch, checkout, reset, merge, push and commit.
//!
//! # Error Handling
//!
//! Every failure is normalized into a [`GitError`] variant naming the step
//! and the branch involved, so the engine can report exactly where a cascade
//! stopped:
//! - [`GitError::Init`]: neither open nor clone succeeded
//! - [`GitError::Fetch`] / [`GitError::Push`]: transport, auth or ref rejection
//! - [`GitError::Branch`]: branch enumeration or deletion failed
//! - [`GitError::Checkout`] / [`GitError::Reset`]: working tree update failed
//! - [`GitError::MergeAnalysis`]: the branches need something other than a normal merge
//! - [`GitError::MergeConflict`]: the merge left conflicts in the index
//!
//! # Resource Lifetime
//!
//! git2 handles (`Reference`, `Commit`, `Tree`, `Index`, `Remote`) are
//! scoped to the method that opened them and released on drop. Only the
//! `Repository` itself outlives a call.
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::git::Git;
//!
//! let (git, mode) = Git::open_or_clone(path, url, credentials, author)?;
//! git.fetch()?;
//! git.checkout(&branch)?;
//! git.reset(&branch)?;
//! ```

use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Cred, ErrorCode, FetchOptions, FetchPrune, FileFavor, MergeOptions, PushOptions,
    RemoteCallbacks, ResetType, Signature,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::cascade::{build_cascade, Cascade};
use crate::core::types::{
    Author, BranchName, BranchOrigin, BranchRef, CascadeOptions, CommitId, Credentials,
};

/// Name of the single remote every working copy is bound to.
pub const DEFAULT_REMOTE: &str = "origin";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository could be neither opened nor cloned.
    #[error("cannot initialize repository at {} from {url}: {message}", path.display())]
    Init {
        path: PathBuf,
        url: String,
        message: String,
    },

    /// Fetching from the remote failed.
    #[error("fetch from {remote} failed: {message}")]
    Fetch { remote: String, message: String },

    /// Enumerating or deleting branches failed.
    #[error("branch operation on {branch} failed: {message}")]
    Branch { branch: String, message: String },

    /// Switching the working tree to a branch failed.
    #[error("checkout of {branch} failed: {message}")]
    Checkout { branch: String, message: String },

    /// Hard reset to the remote tip failed.
    #[error("reset of {branch} to {remote}/{branch} failed: {message}")]
    Reset {
        branch: String,
        remote: String,
        message: String,
    },

    /// Anything other than a normal two-parent merge would be required.
    #[error("cannot merge {from} into {into}: {reason}")]
    MergeAnalysis {
        from: String,
        into: String,
        reason: String,
    },

    /// The merge produced index conflicts.
    #[error("merge of {from} into {into} conflicts in {}", paths.join(", "))]
    MergeConflict {
        from: String,
        into: String,
        paths: Vec<String>,
    },

    /// Any other failure while merging.
    #[error("merge of {from} into {into} failed: {message}")]
    Merge {
        from: String,
        into: String,
        message: String,
    },

    /// Pushing a branch failed or the remote rejected the update.
    #[error("push of {branch} to {remote} failed: {message}")]
    Push {
        branch: String,
        remote: String,
        message: String,
    },

    /// Creating a commit failed.
    #[error("commit failed: {message}")]
    Commit { message: String },

    /// A ref that had to exist does not.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },
}

impl GitError {
    /// Whether this failure is a content conflict a human has to resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GitError::MergeConflict { .. })
    }

    fn branch(branch: &str, err: git2::Error) -> Self {
        GitError::Branch {
            branch: branch.to_string(),
            message: err.message().to_string(),
        }
    }

    fn checkout(branch: &str, err: git2::Error) -> Self {
        GitError::Checkout {
            branch: branch.to_string(),
            message: err.message().to_string(),
        }
    }

    fn merge(from: &str, into: &str, err: git2::Error) -> Self {
        GitError::Merge {
            from: from.to_string(),
            into: into.to_string(),
            message: err.message().to_string(),
        }
    }

    fn commit(err: git2::Error) -> Self {
        GitError::Commit {
            message: err.message().to_string(),
        }
    }
}

/// How [`Git::open_or_clone`] obtained the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// An existing local repository was opened.
    Opened,
    /// The remote was cloned into an empty path.
    Cloned,
}

/// Result of a successful [`Git::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Destination already contains the source; nothing was committed.
    UpToDate,
    /// A two-parent merge commit was created on the destination.
    Merged(CommitId),
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,
    /// Merge in progress (e.g. left behind by a conflict).
    Merge,
    /// Rebase in progress.
    Rebase,
    /// Cherry-pick or revert in progress.
    Sequencer,
    /// Bisect, mailbox apply and the like.
    Other,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use cascade_merge::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }
}

/// The repository client.
///
/// Owns one working copy. Not `Sync`: a working copy must never be driven by
/// two cascades at once.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    /// Presented on every transport callback
    credentials: Credentials,
    /// Identity for [`Git::commit`]
    author: Author,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Fresh callbacks for one transport call.
fn remote_callbacks(credentials: &Credentials) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if !credentials.is_empty() {
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            Cred::userpass_plaintext(&credentials.username, &credentials.password)
        });
    }
    callbacks
}

impl Git {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Open the repository at `path`, or clone `url` into it when there is none.
    ///
    /// An existing clone whose `origin` points elsewhere is re-pointed at `url`.
    ///
    /// # Errors
    ///
    /// - [`GitError::Init`] if neither opening nor cloning succeeds
    pub fn open_or_clone(
        path: &Path,
        url: &str,
        credentials: Credentials,
        author: Author,
    ) -> Result<(Self, OpenMode), GitError> {
        let init_error = |err: git2::Error| GitError::Init {
            path: path.to_path_buf(),
            url: url.to_string(),
            message: err.message().to_string(),
        };

        if path.join(".git").exists() {
            let repo = git2::Repository::open(path).map_err(init_error)?;
            let current = repo
                .find_remote(DEFAULT_REMOTE)
                .ok()
                .and_then(|remote| remote.url().map(String::from));
            match current {
                Some(current) if current == url => {}
                Some(current) => {
                    info!(path = %path.display(), from = %current, to = %url, "re-pointing origin");
                    repo.remote_set_url(DEFAULT_REMOTE, url).map_err(init_error)?;
                }
                None => {
                    repo.remote(DEFAULT_REMOTE, url).map_err(init_error)?;
                }
            }
            debug!(path = %path.display(), "opened existing repository");
            return Ok((
                Self {
                    repo,
                    credentials,
                    author,
                },
                OpenMode::Opened,
            ));
        }

        info!(path = %path.display(), url = %url, "cloning repository");
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(&credentials));
        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, path)
            .map_err(init_error)?;

        Ok((
            Self {
                repo,
                credentials,
                author,
            },
            OpenMode::Cloned,
        ))
    }

    /// Open an existing working copy without touching the remote.
    ///
    /// # Errors
    ///
    /// - [`GitError::Init`] if `path` is not a repository
    pub fn open(path: &Path, credentials: Credentials, author: Author) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|e| GitError::Init {
            path: path.to_path_buf(),
            url: String::new(),
            message: e.message().to_string(),
        })?;
        Ok(Self {
            repo,
            credentials,
            author,
        })
    }

    /// Path to the working directory (the `.git` directory for bare repositories).
    pub fn work_dir(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Get the current Git state (merge, rebase, ...).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::CherryPick
            | git2::RepositoryState::CherryPickSequence
            | git2::RepositoryState::Revert
            | git2::RepositoryState::RevertSequence => GitState::Sequencer,
            _ => GitState::Other,
        }
    }

    /// Check if there are unresolved conflicts in the index.
    pub fn has_conflicts(&self) -> Result<bool, GitError> {
        let index = self.repo.index().map_err(GitError::commit)?;
        Ok(index.has_conflicts())
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Commit HEAD points at, `None` while HEAD is unborn.
    pub fn head_oid(&self) -> Result<Option<CommitId>, GitError> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(|_| GitError::RefNotFound {
                    refname: "HEAD".to_string(),
                })?;
                Ok(Some(CommitId::new(commit.id().to_string())))
            }
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(GitError::RefNotFound {
                refname: format!("HEAD: {}", e.message()),
            }),
        }
    }

    /// Name of the branch HEAD is on, `None` when detached or unborn.
    pub fn current_branch(&self) -> Option<String> {
        let head = self.repo.head().ok()?;
        if head.is_branch() {
            head.shorthand().map(String::from)
        } else {
            None
        }
    }

    /// Tip of a local branch or of its remote-tracking counterpart.
    pub fn resolve_branch(
        &self,
        name: &str,
        origin: BranchOrigin,
    ) -> Result<Option<CommitId>, GitError> {
        let (lookup, kind) = match origin {
            BranchOrigin::Local => (name.to_string(), BranchType::Local),
            BranchOrigin::Remote => (format!("{DEFAULT_REMOTE}/{name}"), BranchType::Remote),
        };
        match self.repo.find_branch(&lookup, kind) {
            Ok(branch) => {
                let commit = branch
                    .get()
                    .peel_to_commit()
                    .map_err(|e| GitError::branch(&lookup, e))?;
                Ok(Some(CommitId::new(commit.id().to_string())))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::branch(&lookup, e)),
        }
    }

    // =========================================================================
    // Branch Enumeration
    // =========================================================================

    /// All local branch names.
    pub fn list_local_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        self.list_branches(BranchType::Local)
    }

    /// All remote-tracking branches of `origin`, with the remote prefix stripped.
    ///
    /// The symbolic `origin/HEAD` and names that are not valid branch names
    /// are skipped.
    pub fn list_remote_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        self.list_branches(BranchType::Remote)
    }

    fn list_branches(&self, kind: BranchType) -> Result<Vec<BranchRef>, GitError> {
        let prefix = format!("{DEFAULT_REMOTE}/");
        let branches = self
            .repo
            .branches(Some(kind))
            .map_err(|e| GitError::branch("*", e))?;

        let mut refs = Vec::new();
        for entry in branches {
            let (branch, _) = entry.map_err(|e| GitError::branch("*", e))?;
            let Some(full) = branch.name().ok().flatten() else {
                continue;
            };
            let short = match kind {
                BranchType::Local => full,
                BranchType::Remote => match full.strip_prefix(&prefix) {
                    Some(short) if short != "HEAD" => short,
                    _ => continue,
                },
            };
            if let Ok(name) = BranchName::new(short) {
                refs.push(match kind {
                    BranchType::Local => BranchRef::local(name),
                    BranchType::Remote => BranchRef::remote(name),
                });
            }
        }

        Ok(refs)
    }

    /// Order the remote branches into a cascade starting after `start`.
    ///
    /// # Errors
    ///
    /// Only enumeration failures ([`GitError::Branch`]) are possible.
    pub fn build_cascade(
        &self,
        options: &CascadeOptions,
        start: &BranchName,
    ) -> Result<Cascade, GitError> {
        let remote = self.list_remote_branches()?;
        let cascade = build_cascade(remote.into_iter().map(|b| b.name), options, start);
        info!(start = %start, cascade = %cascade, "built cascade");
        Ok(cascade)
    }

    // =========================================================================
    // Branch Sync
    // =========================================================================

    /// Delete every local branch except `keep`.
    ///
    /// If HEAD is on a branch that is about to go, HEAD is detached at the
    /// same commit first so the deletion is allowed.
    ///
    /// # Errors
    ///
    /// - [`GitError::Branch`] if a deletion fails
    pub fn remove_local_branches(&self, keep: &str) -> Result<(), GitError> {
        if let Some(current) = self.current_branch() {
            if current != keep {
                let head = self
                    .repo
                    .head()
                    .and_then(|h| h.peel_to_commit())
                    .map_err(|e| GitError::branch(&current, e))?;
                self.repo
                    .set_head_detached(head.id())
                    .map_err(|e| GitError::branch(&current, e))?;
            }
        }

        let doomed: Vec<String> = self
            .list_local_branches()?
            .into_iter()
            .map(|b| b.name.to_string())
            .filter(|name| name != keep)
            .collect();

        for name in &doomed {
            let mut branch = self
                .repo
                .find_branch(name, BranchType::Local)
                .map_err(|e| GitError::branch(name, e))?;
            branch.delete().map_err(|e| GitError::branch(name, e))?;
        }
        let removed = doomed.len();

        debug!(removed, keep = %keep, "removed local branches");
        Ok(())
    }

    /// Fetch `origin` with pruning of deleted remote branches.
    ///
    /// # Errors
    ///
    /// - [`GitError::Fetch`] on transport or authentication failure
    pub fn fetch(&self) -> Result<(), GitError> {
        let fetch_error = |err: git2::Error| GitError::Fetch {
            remote: DEFAULT_REMOTE.to_string(),
            message: err.message().to_string(),
        };

        let mut remote = self.repo.find_remote(DEFAULT_REMOTE).map_err(fetch_error)?;
        let mut options = FetchOptions::new();
        options
            .remote_callbacks(remote_callbacks(&self.credentials))
            .prune(FetchPrune::On);

        // No refspecs: use the ones configured for the remote.
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(fetch_error)?;

        debug!(remote = DEFAULT_REMOTE, "fetched");
        Ok(())
    }

    /// Abandon a merge left in progress, restoring index and working tree to HEAD.
    ///
    /// Does nothing when the repository is clean or HEAD is unborn.
    pub fn abort_merge(&self) -> Result<(), GitError> {
        if !self.state().is_in_progress() && !self.has_conflicts()? {
            return Ok(());
        }
        let reset_error = |err: git2::Error| GitError::Reset {
            branch: "HEAD".to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            message: err.message().to_string(),
        };
        if let Ok(head) = self.repo.head().and_then(|h| h.peel_to_commit()) {
            self.repo
                .reset(head.as_object(), ResetType::Hard, None)
                .map_err(reset_error)?;
        }
        self.repo.cleanup_state().map_err(reset_error)?;
        debug!("abandoned in-progress merge");
        Ok(())
    }

    /// Check out `branch`, creating it from its remote tip when missing.
    ///
    /// A new local branch starts at `origin/<branch>` with its upstream set;
    /// without a remote counterpart it starts at the current HEAD commit.
    /// The working tree is forced to the branch tip, local differences in
    /// the working copy are disposable.
    ///
    /// # Errors
    ///
    /// - [`GitError::Checkout`] if the branch cannot be created or checked out
    pub fn checkout(&self, branch: &BranchName) -> Result<(), GitError> {
        let name = branch.as_str();
        let remote_name = format!("{DEFAULT_REMOTE}/{name}");
        self.abort_merge()?;

        let remote_branch = match self.repo.find_branch(&remote_name, BranchType::Remote) {
            Ok(b) => Some(b),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(GitError::checkout(name, e)),
        };

        let local = match self.repo.find_branch(name, BranchType::Local) {
            Ok(local) => local,
            Err(e) if e.code() == ErrorCode::NotFound => {
                let start = match &remote_branch {
                    Some(remote) => remote.get().peel_to_commit(),
                    None => self.repo.head().and_then(|h| h.peel_to_commit()),
                }
                .map_err(|e| GitError::checkout(name, e))?;

                let mut local = self
                    .repo
                    .branch(name, &start, false)
                    .map_err(|e| GitError::checkout(name, e))?;
                if remote_branch.is_some() {
                    local
                        .set_upstream(Some(&remote_name))
                        .map_err(|e| GitError::checkout(name, e))?;
                }
                debug!(branch = %name, from = %start.id(), "created local branch");
                local
            }
            Err(e) => return Err(GitError::checkout(name, e)),
        };

        let tip = local
            .get()
            .peel_to_commit()
            .map_err(|e| GitError::checkout(name, e))?;

        let mut checkout = CheckoutBuilder::new();
        checkout
            .force()
            .recreate_missing(true)
            .allow_conflicts(true)
            .use_theirs(true);
        self.repo
            .checkout_tree(tip.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::checkout(name, e))?;
        self.repo
            .set_head(&branch.local_ref())
            .map_err(|e| GitError::checkout(name, e))?;

        Ok(())
    }

    /// Hard-reset the checked-out `branch` to `origin/<branch>`.
    ///
    /// Discards local-only commits, index and working tree changes, and any
    /// merge left in progress. Running it twice leaves the same commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::Reset`] if there is no remote counterpart or the reset fails
    pub fn reset(&self, branch: &BranchName) -> Result<(), GitError> {
        let reset_error = |message: String| GitError::Reset {
            branch: branch.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            message,
        };

        let remote_name = format!("{DEFAULT_REMOTE}/{branch}");
        let remote = self
            .repo
            .find_branch(&remote_name, BranchType::Remote)
            .map_err(|e| reset_error(e.message().to_string()))?;
        let commit = remote
            .get()
            .peel_to_commit()
            .map_err(|e| reset_error(e.message().to_string()))?;

        self.repo
            .reset(commit.as_object(), ResetType::Hard, None)
            .map_err(|e| reset_error(e.message().to_string()))?;

        debug!(branch = %branch, commit = %commit.id(), "reset to remote tip");
        Ok(())
    }

    /// Merge local `source` into `destination`.
    ///
    /// `destination` must be checked out (and normally reset). If it already
    /// contains `source` nothing happens. Otherwise a two-parent merge commit
    /// is created with the source tip's author as author and committer and
    /// the message `Automatic merge <source> into <destination>`.
    ///
    /// # Errors
    ///
    /// - [`GitError::MergeAnalysis`] if a normal merge is not possible
    ///   (unborn HEAD, unrelated histories)
    /// - [`GitError::MergeConflict`] if the index has conflicts; the
    ///   repository is left mid-merge for the caller to abandon
    /// - [`GitError::Merge`] for any other failure
    pub fn merge(
        &self,
        source: &BranchName,
        destination: &BranchName,
    ) -> Result<MergeOutcome, GitError> {
        let (src, dst) = (source.as_str(), destination.as_str());
        info!(source = %src, destination = %dst, "merging");

        let source_branch = self
            .repo
            .find_branch(src, BranchType::Local)
            .map_err(|e| GitError::merge(src, dst, e))?;
        let source_commit = source_branch
            .get()
            .peel_to_commit()
            .map_err(|e| GitError::merge(src, dst, e))?;
        let annotated = self
            .repo
            .reference_to_annotated_commit(source_branch.get())
            .map_err(|e| GitError::merge(src, dst, e))?;

        let head_commit = self.repo.head().and_then(|h| h.peel_to_commit()).map_err(|_| {
            GitError::MergeAnalysis {
                from: src.to_string(),
                into: dst.to_string(),
                reason: "destination has no commits".to_string(),
            }
        })?;

        match self.repo.merge_base(head_commit.id(), source_commit.id()) {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(GitError::MergeAnalysis {
                    from: src.to_string(),
                    into: dst.to_string(),
                    reason: "histories are unrelated".to_string(),
                });
            }
            Err(e) => return Err(GitError::merge(src, dst, e)),
        }

        let (analysis, _) = self
            .repo
            .merge_analysis(&[&annotated])
            .map_err(|e| GitError::merge(src, dst, e))?;

        if analysis.is_up_to_date() || analysis.is_none() {
            debug!(source = %src, destination = %dst, "already up to date");
            return Ok(MergeOutcome::UpToDate);
        }
        if !analysis.is_normal() {
            return Err(GitError::MergeAnalysis {
                from: src.to_string(),
                into: dst.to_string(),
                reason: "a normal merge is not possible".to_string(),
            });
        }

        let mut merge_options = MergeOptions::new();
        merge_options.file_favor(FileFavor::Normal);
        let mut checkout = CheckoutBuilder::new();
        checkout.safe().recreate_missing(true).allow_conflicts(true);

        self.repo
            .merge(&[&annotated], Some(&mut merge_options), Some(&mut checkout))
            .map_err(|e| {
                if e.code() == ErrorCode::MergeConflict || e.code() == ErrorCode::Conflict {
                    GitError::MergeConflict {
                        from: src.to_string(),
                        into: dst.to_string(),
                        paths: vec![e.message().to_string()],
                    }
                } else {
                    GitError::merge(src, dst, e)
                }
            })?;

        let mut index = self.repo.index().map_err(|e| GitError::merge(src, dst, e))?;
        if index.has_conflicts() {
            let paths = conflict_paths(&index);
            warn!(source = %src, destination = %dst, paths = ?paths, "merge conflict");
            return Err(GitError::MergeConflict {
                from: src.to_string(),
                into: dst.to_string(),
                paths,
            });
        }

        let tree_id = index.write_tree().map_err(|e| GitError::merge(src, dst, e))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::merge(src, dst, e))?;

        let signature = source_commit.author();
        let message = format!("Automatic merge {src} into {dst}");
        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message,
                &tree,
                &[&head_commit, &source_commit],
            )
            .map_err(|e| GitError::merge(src, dst, e))?;

        self.repo
            .cleanup_state()
            .map_err(|e| GitError::merge(src, dst, e))?;

        info!(source = %src, destination = %dst, commit = %oid, "merged");
        Ok(MergeOutcome::Merged(CommitId::new(oid.to_string())))
    }

    /// Push local `branch` to `refs/heads/<branch>` on `origin`.
    ///
    /// # Errors
    ///
    /// - [`GitError::Push`] on transport or authentication failure, or when
    ///   the remote rejects the update (e.g. non-fast-forward)
    pub fn push(&self, branch: &BranchName) -> Result<(), GitError> {
        let push_error = |message: String| GitError::Push {
            branch: branch.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            message,
        };

        let mut remote = self
            .repo
            .find_remote(DEFAULT_REMOTE)
            .map_err(|e| push_error(e.message().to_string()))?;

        let mut rejection: Option<String> = None;
        {
            let mut callbacks = remote_callbacks(&self.credentials);
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    rejection = Some(format!("{refname} rejected: {status}"));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);

            let refspec = format!("{0}:{0}", branch.local_ref());
            remote
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(|e| push_error(e.message().to_string()))?;
        }

        if let Some(message) = rejection {
            return Err(push_error(message));
        }

        info!(branch = %branch, remote = DEFAULT_REMOTE, "pushed");
        Ok(())
    }

    /// Stage `paths` (relative to the working directory) and commit them on HEAD.
    ///
    /// The commit is chained to the current HEAD commit, or is a root commit
    /// when HEAD is unborn. Author and committer are the configured author
    /// at the current time.
    ///
    /// # Errors
    ///
    /// - [`GitError::Commit`] if staging, tree writing or committing fails
    pub fn commit(&self, message: &str, paths: &[&Path]) -> Result<CommitId, GitError> {
        let mut index = self.repo.index().map_err(GitError::commit)?;
        for path in paths {
            index.add_path(path).map_err(GitError::commit)?;
        }
        let tree_id = index.write_tree().map_err(GitError::commit)?;
        index.write().map_err(GitError::commit)?;
        let tree = self.repo.find_tree(tree_id).map_err(GitError::commit)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(GitError::commit)?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(GitError::commit(e)),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let signature =
            Signature::now(&self.author.name, &self.author.email).map_err(GitError::commit)?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(GitError::commit)?;

        Ok(CommitId::new(oid.to_string()))
    }
}

fn conflict_paths(index: &git2::Index) -> Vec<String> {
    let Ok(conflicts) = index.conflicts() else {
        return Vec::new();
    };
    let mut paths: Vec<String> = conflicts
        .filter_map(Result::ok)
        .filter_map(|c| c.our.or(c.their).or(c.ancestor))
        .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn display_names_branches() {
            let err = GitError::MergeConflict {
                from: "release/1.0".into(),
                into: "release/1.2".into(),
                paths: vec!["a.txt".into(), "b.txt".into()],
            };
            let text = err.to_string();
            assert!(text.contains("release/1.0"));
            assert!(text.contains("release/1.2"));
            assert!(text.contains("a.txt, b.txt"));
            assert!(err.is_conflict());
        }

        #[test]
        fn reset_mentions_remote_branch() {
            let err = GitError::Reset {
                branch: "master".into(),
                remote: "origin".into(),
                message: "not found".into(),
            };
            assert_eq!(
                err.to_string(),
                "reset of master to origin/master failed: not found"
            );
            assert!(!err.is_conflict());
        }

        #[test]
        fn init_shows_path_and_url() {
            let err = GitError::Init {
                path: PathBuf::from("/tmp/x"),
                url: "https://example.com/r.git".into(),
                message: "auth".into(),
            };
            assert!(err.to_string().contains("/tmp/x"));
            assert!(err.to_string().contains("https://example.com/r.git"));
        }
    }

    mod git_state {
        use super::*;

        #[test]
        fn only_clean_is_idle() {
            assert!(!GitState::Clean.is_in_progress());
            for state in [
                GitState::Merge,
                GitState::Rebase,
                GitState::Sequencer,
                GitState::Other,
            ] {
                assert!(state.is_in_progress());
            }
        }
    }

    mod callbacks {
        use super::*;

        #[test]
        fn debug_never_prints_password() {
            let dir = tempfile::TempDir::new().unwrap();
            git2::Repository::init(dir.path()).unwrap();
            let git = Git::open(
                dir.path(),
                Credentials::new("bot", "hunter2"),
                Author::default(),
            )
            .unwrap();
            let debug = format!("{git:?}");
            assert!(debug.contains("bot"));
            assert!(!debug.contains("hunter2"));
        }
    }
}
