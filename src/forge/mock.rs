//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge answers clone URL and branching model lookups from
//! in-memory tables, stores created PRs, records every call and can be
//! told to fail any one operation.
//!
//! # Example
//!
//! ```
//! use cascade_merge::core::types::RepoId;
//! use cascade_merge::forge::mock::MockForge;
//! use cascade_merge::forge::{CreatePrRequest, Forge};
//!
//! # tokio_test::block_on(async {
//! let repo = RepoId::new("acme", "app", "{1}");
//! let forge = MockForge::new().with_clone_url("app", "/srv/git/app.git");
//!
//! assert_eq!(forge.clone_url(&repo, &["https"]).await.unwrap(), "/srv/git/app.git");
//!
//! let pr = forge
//!     .create_pr(&repo, CreatePrRequest::remediation("release/1.0", "release/1.2"))
//!     .await
//!     .unwrap();
//! assert_eq!(pr.id, 1);
//! # });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest};
use crate::core::types::{CascadeOptions, RepoId};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// Clone URLs by repository name.
    clone_urls: HashMap<String, String>,
    /// Branching models by repository name; others get the defaults.
    options: HashMap<String, CascadeOptions>,
    /// Created PRs in creation order.
    prs: Vec<(CreatePrRequest, PullRequest)>,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail clone_url with the given error.
    CloneUrl(ForgeError),
    /// Fail cascade_options with the given error.
    CascadeOptions(ForgeError),
    /// Fail create_pr with the given error.
    CreatePr(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CloneUrl {
        repo: String,
        protocols: Vec<String>,
    },
    CascadeOptions {
        repo: String,
    },
    CreatePr {
        repo: String,
        title: String,
        source: String,
        destination: String,
    },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                clone_urls: HashMap::new(),
                options: HashMap::new(),
                prs: Vec::new(),
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `url` as the clone URL of the repository named `name`.
    pub fn with_clone_url(self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.lock().clone_urls.insert(name.into(), url.into());
        self
    }

    /// Serve `options` as the branching model of the repository named `name`.
    pub fn with_options(self, name: impl Into<String>, options: CascadeOptions) -> Self {
        self.lock().options.insert(name.into(), options);
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use cascade_merge::forge::mock::{FailOn, MockForge};
    /// use cascade_merge::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Requests of every PR created so far, in order.
    pub fn created_prs(&self) -> Vec<CreatePrRequest> {
        self.lock().prs.iter().map(|(req, _)| req.clone()).collect()
    }

    /// Get the count of PRs.
    pub fn pr_count(&self) -> usize {
        self.lock().prs.len()
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail<T>(&self, expected: &str) -> Option<Result<T, ForgeError>> {
        match &self.lock().fail_on {
            Some(FailOn::CloneUrl(e)) if expected == "clone_url" => Some(Err(e.clone())),
            Some(FailOn::CascadeOptions(e)) if expected == "cascade_options" => {
                Some(Err(e.clone()))
            }
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => Some(Err(e.clone())),
            _ => None,
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn clone_url(&self, repo: &RepoId, protocols: &[&str]) -> Result<String, ForgeError> {
        self.record(MockOperation::CloneUrl {
            repo: repo.name.clone(),
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
        });

        if let Some(result) = self.check_fail("clone_url") {
            return result;
        }

        self.lock()
            .clone_urls
            .get(&repo.name)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("cannot determine clone url of {}", repo)))
    }

    async fn cascade_options(&self, repo: &RepoId) -> Result<CascadeOptions, ForgeError> {
        self.record(MockOperation::CascadeOptions {
            repo: repo.name.clone(),
        });

        if let Some(result) = self.check_fail("cascade_options") {
            return result;
        }

        Ok(self
            .lock()
            .options
            .get(&repo.name)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_pr(
        &self,
        repo: &RepoId,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            repo: repo.name.clone(),
            title: request.title.clone(),
            source: request.source.clone(),
            destination: request.destination.clone(),
        });

        if let Some(result) = self.check_fail("create_pr") {
            return result;
        }

        let mut inner = self.lock();
        let id = inner.prs.len() as u64 + 1;
        let pr = PullRequest {
            id,
            url: format!("https://bitbucket.org/mock/{}/pull-requests/{}", repo.name, id),
        };
        inner.prs.push((request, pr.clone()));
        Ok(pr)
    }
}
