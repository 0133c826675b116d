//! forge::traits
//!
//! Forge trait definition for the hosting service a repository lives on.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O.
//! It covers exactly what a cascade needs from the host:
//! - where to clone the repository from
//! - which branches form its branching model
//! - opening a pull request when a cascade cannot finish on its own
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::forge::{CreatePrRequest, Forge};
//!
//! async fn remediate(forge: &dyn Forge, repo: &RepoId) -> Result<(), ForgeError> {
//!     let pr = forge
//!         .create_pr(repo, CreatePrRequest::remediation("release/1.0", "release/1.2"))
//!         .await?;
//!     println!("Opened PR #{}: {}", pr.id, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{CascadeOptions, RepoId};

/// Title of pull requests opened for a failed cascade.
pub const REMEDIATION_TITLE: &str = "Automatic merge failure";

/// Description of pull requests opened for a failed cascade.
pub const REMEDIATION_DESCRIPTION: &str =
    "There was a merge conflict automatically merging this branch";

/// Errors from forge operations.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Credentials were rejected or lack permission.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The repository has no usable branching model.
    #[error("branching model incomplete: {0}")]
    MissingBranchingModel(String),
}

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// PR title
    pub title: String,
    /// PR description
    pub description: String,
    /// Branch with the changes
    pub source: String,
    /// Branch to merge into
    pub destination: String,
}

impl CreatePrRequest {
    /// The request filed when a cascade from `source` into `destination` fails.
    pub fn remediation(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            title: REMEDIATION_TITLE.to_string(),
            description: REMEDIATION_DESCRIPTION.to_string(),
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR identifier
    pub id: u64,
    /// Web URL for viewing
    pub url: String,
}

/// The Forge trait for interacting with a hosting service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by the
/// worker for the lifetime of the process.
///
/// # Error Handling
///
/// No method retries. A failure of `clone_url` or `cascade_options` means
/// the event is skipped; a failure of `create_pr` is logged.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "bitbucket").
    fn name(&self) -> &'static str;

    /// Clone URL for `repo`.
    ///
    /// Picks the first advertised URL whose protocol matches one of
    /// `protocols`, trying them in order. An empty list takes the first URL.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or a matching URL doesn't exist
    async fn clone_url(&self, repo: &RepoId, protocols: &[&str]) -> Result<String, ForgeError>;

    /// Branching model of `repo` as cascade options.
    ///
    /// # Errors
    ///
    /// - `MissingBranchingModel` if no release branch type is configured
    async fn cascade_options(&self, repo: &RepoId) -> Result<CascadeOptions, ForgeError>;

    /// Open a pull request.
    ///
    /// # Errors
    ///
    /// - `AuthFailed` if the credentials lack permission
    /// - `ApiError` if validation fails (e.g. the branches don't exist)
    async fn create_pr(
        &self,
        repo: &RepoId,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_request() {
        let req = CreatePrRequest::remediation("release/1.0", "release/1.2");
        assert_eq!(req.title, "Automatic merge failure");
        assert_eq!(
            req.description,
            "There was a merge conflict automatically merging this branch"
        );
        assert_eq!(req.source, "release/1.0");
        assert_eq!(req.destination, "release/1.2");
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthFailed("bad app password".into())),
            "authentication failed: bad app password"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("repositories/a/b".into())),
            "not found: repositories/a/b"
        );
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 400,
                    message: "branch not found".into()
                }
            ),
            "API error: 400 - branch not found"
        );
        assert_eq!(
            format!("{}", ForgeError::MissingBranchingModel("no release type".into())),
            "branching model incomplete: no release type"
        );
    }
}
