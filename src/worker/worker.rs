//! worker::worker
//!
//! The single consumer of the event queue.
//!
//! # Per-event flow
//!
//! ```text
//! clone_url -> cascade_options -> skip check -> open/clone + cascade (blocking)
//!     -> on failure with a target: open remediation PR
//! ```
//!
//! Forge lookups that fail skip the event. Nothing is retried and no
//! failure ends the loop.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::event::CascadeEvent;
use super::queue::EventReceiver;
use crate::core::config::ServiceConfig;
use crate::core::types::{Author, BranchName, CascadeOptions, Credentials};
use crate::engine::{CascadeFailure, CascadeReport, CascadeRunner};
use crate::forge::{CreatePrRequest, Forge, ForgeError, PullRequest};
use crate::git::{Git, GitError};

/// Why an event produced no cascade run.
#[derive(Debug)]
pub enum SkipReason {
    /// The clone URL lookup failed.
    CloneUrl(ForgeError),
    /// The branching model lookup failed.
    BranchingModel(ForgeError),
    /// The destination is an ordinary development merge.
    DevelopmentMerge { destination: String },
    /// The destination is not a valid branch name.
    InvalidBranch { destination: String },
    /// The working copy could not be prepared.
    Workspace(WorkspaceError),
}

/// Failure to get a working copy ready for the cascade.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    /// The blocking task panicked or was cancelled.
    #[error("workspace task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::CloneUrl(e) => write!(f, "cannot read clone url: {e}"),
            SkipReason::BranchingModel(e) => {
                write!(f, "cannot detect cascade options, check branching model: {e}")
            }
            SkipReason::DevelopmentMerge { destination } => {
                write!(f, "{destination} is a development merge")
            }
            SkipReason::InvalidBranch { destination } => {
                write!(f, "invalid destination branch '{destination}'")
            }
            SkipReason::Workspace(e) => write!(f, "workspace unavailable: {e}"),
        }
    }
}

/// What processing one event amounted to.
#[derive(Debug)]
pub enum EventOutcome {
    /// No cascade was attempted.
    Skipped(SkipReason),
    /// The cascade ran to the end.
    Cascaded(CascadeReport),
    /// The cascade failed and a pull request now carries the conflict.
    Remediated {
        failure: CascadeFailure,
        pull_request: PullRequest,
    },
    /// The cascade failed and no pull request was opened. `error` is set
    /// when opening one was attempted and failed.
    Unremediated {
        failure: CascadeFailure,
        error: Option<ForgeError>,
    },
}

impl EventOutcome {
    /// Whether a cascade run happened at all.
    pub fn ran(&self) -> bool {
        !matches!(self, EventOutcome::Skipped(_))
    }
}

/// Worker settings taken from the service configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Root of the per-repository working copies.
    pub workdir: PathBuf,
    /// Preferred clone transport.
    pub clone_protocol: String,
    pub credentials: Credentials,
    pub author: Author,
}

impl From<&ServiceConfig> for WorkerSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            workdir: config.workdir.clone(),
            clone_protocol: config.clone_protocol.clone(),
            credentials: config.credentials.clone(),
            author: config.author.clone(),
        }
    }
}

/// Drains the event queue, one cascade at a time.
pub struct EventWorker {
    forge: Arc<dyn Forge>,
    settings: WorkerSettings,
}

impl std::fmt::Debug for EventWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWorker")
            .field("forge", &self.forge.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl EventWorker {
    pub fn new(forge: Arc<dyn Forge>, settings: WorkerSettings) -> Self {
        Self { forge, settings }
    }

    /// Process events until every sender is dropped.
    pub async fn run(self, mut events: EventReceiver) {
        info!(forge = self.forge.name(), "event worker started");
        while let Some(event) = events.recv().await {
            self.process(event).await;
        }
        info!("event worker stopped");
    }

    /// Handle a single event end to end.
    pub async fn process(&self, event: CascadeEvent) -> EventOutcome {
        let repo = &event.repository;
        debug!(repo = %repo, source = %event.source, destination = %event.destination, "processing event");

        let protocols = [self.settings.clone_protocol.as_str()];
        let url = match self.forge.clone_url(repo, &protocols).await {
            Ok(url) => url,
            Err(e) => return skip(&event, SkipReason::CloneUrl(e)),
        };

        let options = match self.forge.cascade_options(repo).await {
            Ok(options) => options,
            Err(e) => return skip(&event, SkipReason::BranchingModel(e)),
        };

        if options.skips_destination(&event.destination) {
            return skip(
                &event,
                SkipReason::DevelopmentMerge {
                    destination: event.destination.clone(),
                },
            );
        }

        let trigger = match BranchName::new(event.destination.as_str()) {
            Ok(name) => name,
            Err(_) => {
                return skip(
                    &event,
                    SkipReason::InvalidBranch {
                        destination: event.destination.clone(),
                    },
                )
            }
        };

        let path = self.settings.workdir.join(repo.workdir_key());
        let credentials = self.settings.credentials.clone();
        let author = self.settings.author.clone();
        let joined = tokio::task::spawn_blocking(move || {
            cascade_in(path, &url, credentials, author, &trigger, &options)
        })
        .await;

        let result = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return skip(&event, SkipReason::Workspace(e)),
            Err(e) => return skip(&event, SkipReason::Workspace(e.into())),
        };

        match result {
            Ok(report) => {
                info!(repo = %repo, trigger = %report.trigger, hops = report.hops.len(), merged = report.merged_count(), "cascade succeeded");
                EventOutcome::Cascaded(report)
            }
            Err(failure) => self.remediate(&event, failure).await,
        }
    }

    async fn remediate(&self, event: &CascadeEvent, failure: CascadeFailure) -> EventOutcome {
        let repo = &event.repository;
        let Some(target) = failure.target.as_ref() else {
            error!(repo = %repo, step = %failure.step, error = %failure.error, "cascade failed before merging");
            return EventOutcome::Unremediated {
                failure,
                error: None,
            };
        };

        let request = CreatePrRequest::remediation(failure.source.as_str(), target.as_str());
        match self.forge.create_pr(repo, request).await {
            Ok(pull_request) => {
                warn!(
                    repo = %repo,
                    source = %failure.source,
                    target = %target,
                    error = %failure.error,
                    pr = pull_request.id,
                    link = %pull_request.url,
                    "cascade failed, opened pull request"
                );
                EventOutcome::Remediated {
                    failure,
                    pull_request,
                }
            }
            Err(e) => {
                error!(
                    repo = %repo,
                    source = %failure.source,
                    target = %target,
                    error = %e,
                    "could not create pull request"
                );
                EventOutcome::Unremediated {
                    failure,
                    error: Some(e),
                }
            }
        }
    }
}

fn skip(event: &CascadeEvent, reason: SkipReason) -> EventOutcome {
    match &reason {
        SkipReason::DevelopmentMerge { .. } => {
            debug!(repo = %event.repository, reason = %reason, "event skipped")
        }
        _ => warn!(repo = %event.repository, reason = %reason, "event skipped"),
    }
    EventOutcome::Skipped(reason)
}

/// Open (or clone) the working copy and run the cascade. Blocking.
///
/// The outer error is a workspace failure; the inner result is the cascade.
fn cascade_in(
    path: PathBuf,
    url: &str,
    credentials: Credentials,
    author: Author,
    trigger: &BranchName,
    options: &CascadeOptions,
) -> Result<Result<CascadeReport, CascadeFailure>, WorkspaceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| WorkspaceError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let (git, mode) = Git::open_or_clone(&path, url, credentials, author)?;
    debug!(path = %path.display(), mode = ?mode, "working copy ready");

    Ok(CascadeRunner::new(&git).run(trigger, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepoId;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};
    use tempfile::TempDir;

    fn worker(forge: &MockForge, dir: &TempDir) -> EventWorker {
        EventWorker::new(
            Arc::new(forge.clone()),
            WorkerSettings {
                workdir: dir.path().to_path_buf(),
                clone_protocol: "https".into(),
                credentials: Credentials::default(),
                author: Author::default(),
            },
        )
    }

    fn event(destination: &str) -> CascadeEvent {
        CascadeEvent::new(RepoId::new("acme", "app", "{1}"), "feature/x", destination)
    }

    #[tokio::test]
    async fn clone_url_failure_skips() {
        let dir = TempDir::new().unwrap();
        let forge = MockForge::new();
        let outcome = worker(&forge, &dir).process(event("release/1.0")).await;

        assert!(matches!(
            outcome,
            EventOutcome::Skipped(SkipReason::CloneUrl(ForgeError::NotFound(_)))
        ));
        assert!(!outcome.ran());
    }

    #[tokio::test]
    async fn branching_model_failure_skips() {
        let dir = TempDir::new().unwrap();
        let forge = MockForge::new()
            .with_clone_url("app", "/nonexistent.git")
            .fail_on(FailOn::CascadeOptions(ForgeError::MissingBranchingModel(
                "no release type".into(),
            )));

        let outcome = worker(&forge, &dir).process(event("release/1.0")).await;
        assert!(matches!(
            outcome,
            EventOutcome::Skipped(SkipReason::BranchingModel(_))
        ));
        assert_eq!(forge.pr_count(), 0);
    }

    #[tokio::test]
    async fn development_merge_skips() {
        let dir = TempDir::new().unwrap();
        let forge = MockForge::new().with_clone_url("app", "/nonexistent.git");

        let outcome = worker(&forge, &dir).process(event("develop")).await;
        assert!(matches!(
            outcome,
            EventOutcome::Skipped(SkipReason::DevelopmentMerge { .. })
        ));
        // No clone attempted.
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn invalid_destination_skips() {
        let dir = TempDir::new().unwrap();
        let forge = MockForge::new().with_clone_url("app", "/nonexistent.git");

        let outcome = worker(&forge, &dir).process(event("release/..bad")).await;
        assert!(matches!(
            outcome,
            EventOutcome::Skipped(SkipReason::InvalidBranch { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_remote_is_a_workspace_skip() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-remote.git");
        let forge = MockForge::new().with_clone_url("app", missing.to_string_lossy());

        let outcome = worker(&forge, &dir).process(event("release/1.0")).await;
        assert!(matches!(
            outcome,
            EventOutcome::Skipped(SkipReason::Workspace(WorkspaceError::Git(GitError::Init { .. })))
        ));
        assert!(!forge
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::CreatePr { .. })));
    }

    #[tokio::test]
    async fn blocked_workdir_is_a_create_dir_skip() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let forge = MockForge::new().with_clone_url("app", "/nonexistent.git");
        let worker = EventWorker::new(
            Arc::new(forge.clone()),
            WorkerSettings {
                workdir: blocker.join("nested"),
                clone_protocol: "https".into(),
                credentials: Credentials::default(),
                author: Author::default(),
            },
        );

        let outcome = worker.process(event("release/1.0")).await;
        match outcome {
            EventOutcome::Skipped(SkipReason::Workspace(WorkspaceError::CreateDir { path, .. })) => {
                assert!(path.starts_with(&blocker));
            }
            other => panic!("expected CreateDir skip, got {other:?}"),
        }
    }

    #[test]
    fn settings_from_config() {
        let config = ServiceConfig {
            clone_protocol: "ssh".into(),
            ..Default::default()
        };
        let settings = WorkerSettings::from(&config);
        assert_eq!(settings.clone_protocol, "ssh");
        assert_eq!(settings.workdir, config.workdir);
    }

    #[test]
    fn skip_reason_display() {
        let reason = SkipReason::DevelopmentMerge {
            destination: "develop".into(),
        };
        assert_eq!(reason.to_string(), "develop is a development merge");
    }
}
