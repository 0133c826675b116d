//! worker::event
//!
//! Webhook payload types and the event the worker consumes.
//!
//! The payload mirrors the subset of a Bitbucket `pullrequest:fulfilled`
//! delivery the worker needs. Unknown fields are ignored.

use serde::Deserialize;

use crate::core::types::RepoId;

/// A pull-request-merged webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub repository: RepositoryPayload,
    #[serde(alias = "pull_request")]
    pub pullrequest: PullRequestInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    pub owner: OwnerPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerPayload {
    #[serde(default)]
    pub uuid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    pub source: EndpointPayload,
    pub destination: EndpointPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointPayload {
    pub branch: BranchPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchPayload {
    pub name: String,
}

/// One merged pull request, as queued for the worker.
///
/// Branch names are kept as received; the worker validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeEvent {
    /// Repository the pull request was merged in.
    pub repository: RepoId,
    /// Branch the pull request came from.
    pub source: String,
    /// Branch the pull request was merged into; the cascade trigger.
    pub destination: String,
}

impl CascadeEvent {
    pub fn new(
        repository: RepoId,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl From<PullRequestPayload> for CascadeEvent {
    fn from(payload: PullRequestPayload) -> Self {
        let repo = payload.repository;
        Self {
            repository: RepoId::new(repo.owner.uuid, repo.name, repo.uuid),
            source: payload.pullrequest.source.branch.name,
            destination: payload.pullrequest.destination.branch.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULFILLED: &str = r#"{
        "actor": {"display_name": "Someone"},
        "repository": {
            "name": "app",
            "full_name": "acme/app",
            "uuid": "{repo-uuid}",
            "owner": {"uuid": "{owner-uuid}", "display_name": "Acme"}
        },
        "pullrequest": {
            "id": 7,
            "source": {"branch": {"name": "feature/login"}},
            "destination": {"branch": {"name": "release/1.0"}}
        }
    }"#;

    #[test]
    fn parses_bitbucket_payload() {
        let payload: PullRequestPayload = serde_json::from_str(FULFILLED).unwrap();
        let event = CascadeEvent::from(payload);

        assert_eq!(
            event.repository,
            RepoId::new("{owner-uuid}", "app", "{repo-uuid}")
        );
        assert_eq!(event.source, "feature/login");
        assert_eq!(event.destination, "release/1.0");
    }

    #[test]
    fn accepts_pull_request_alias() {
        let json = FULFILLED.replace("\"pullrequest\"", "\"pull_request\"");
        let payload: PullRequestPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.pullrequest.destination.branch.name, "release/1.0");
    }

    #[test]
    fn missing_uuids_default_to_empty() {
        let json = r#"{
            "repository": {"name": "app", "owner": {}},
            "pullrequest": {
                "source": {"branch": {"name": "a"}},
                "destination": {"branch": {"name": "b"}}
            }
        }"#;
        let event = CascadeEvent::from(serde_json::from_str::<PullRequestPayload>(json).unwrap());
        assert_eq!(event.repository.uuid, "");
        assert_eq!(event.repository.workdir_key(), "_app");
    }

    #[test]
    fn missing_destination_rejected() {
        let json = r#"{
            "repository": {"name": "app", "owner": {}},
            "pullrequest": {"source": {"branch": {"name": "a"}}}
        }"#;
        assert!(serde_json::from_str::<PullRequestPayload>(json).is_err());
    }
}
