//! forge::bitbucket
//!
//! Bitbucket Cloud forge implementation using the REST 2.0 API.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | `clone_url` | `GET /repositories/{owner}/{name}` |
//! | `cascade_options` | `GET /repositories/{owner}/{name}/branching-model` |
//! | `create_pr` | `POST /repositories/{owner}/{name}/pullrequests` |
//!
//! # Authentication
//!
//! HTTP basic auth with a username and app password. The same pair is used
//! by the git transport.
//!
//! # Rate Limiting
//!
//! Returns `ForgeError::RateLimited` on HTTP 429. Nothing is retried.
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::forge::bitbucket::BitbucketForge;
//!
//! let forge = BitbucketForge::new(credentials);
//! let url = forge.clone_url(&repo, &["https"]).await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest};
use crate::core::config::schema::DEFAULT_BITBUCKET_API;
use crate::core::types::{CascadeOptions, Credentials, RepoId};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "cascade-merge";

/// Bitbucket Cloud forge.
pub struct BitbucketForge {
    /// HTTP client for making requests
    client: Client,
    /// Basic auth pair
    credentials: Credentials,
    /// API base URL (configurable for tests)
    api_base: String,
}

// Custom Debug to avoid exposing the password
impl std::fmt::Debug for BitbucketForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketForge")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl BitbucketForge {
    /// Create a forge talking to Bitbucket Cloud.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_api_base(credentials, DEFAULT_BITBUCKET_API)
    }

    /// Create a forge with a custom API base URL.
    pub fn with_api_base(credentials: Credentials, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            api_base: api_base.into(),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    /// Build URL for a repository endpoint.
    ///
    /// Each component is pushed as one path segment, so owner and name are
    /// percent-encoded and cannot add segments of their own.
    fn repo_url(&self, repo: &RepoId, tail: &[&str]) -> Result<Url, ForgeError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            ForgeError::InvalidResponse(format!("invalid API base '{}': {}", self.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ForgeError::InvalidResponse(format!("API base '{}' cannot hold a path", self.api_base))
            })?
            .pop_if_empty()
            .push("repositories")
            .push(&repo.owner)
            .push(&repo.name)
            .extend(tail);
        Ok(url)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, ForgeError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .headers(Self::headers())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ForgeError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        let message = match response.json::<BitbucketErrorResponse>().await {
            Ok(err) => err.error.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid credentials".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Bitbucket server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Forge for BitbucketForge {
    fn name(&self) -> &'static str {
        "bitbucket"
    }

    async fn clone_url(&self, repo: &RepoId, protocols: &[&str]) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &[])?;
        let repository: BitbucketRepository = self.get(url).await?;
        select_clone_url(&repository.links.clone, protocols)
            .ok_or_else(|| ForgeError::NotFound(format!("cannot determine clone url of {}", repo)))
    }

    async fn cascade_options(&self, repo: &RepoId) -> Result<CascadeOptions, ForgeError> {
        let url = self.repo_url(repo, &["branching-model"])?;
        let model: BitbucketBranchingModel = self.get(url).await?;
        model.into_options().ok_or_else(|| {
            ForgeError::MissingBranchingModel(format!("no release branch type on {}", repo))
        })
    }

    async fn create_pr(
        &self,
        repo: &RepoId,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(repo, &["pullrequests"])?;
        let body = BitbucketCreatePr::from(&request);

        debug!(url = %url, source = %request.source, destination = %request.destination, "POST pull request");
        let response = self
            .client
            .post(url)
            .headers(Self::headers())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let pr: BitbucketPullRequest = self.handle_response(response).await?;
        Ok(pr.into())
    }
}

/// First clone link whose name is one of `protocols`, in link order.
///
/// With no protocols, the first link.
fn select_clone_url(links: &[BitbucketLink], protocols: &[&str]) -> Option<String> {
    links
        .iter()
        .find(|link| {
            protocols.is_empty()
                || link
                    .name
                    .as_deref()
                    .is_some_and(|name| protocols.contains(&name))
        })
        .map(|link| link.href.clone())
}

// --------------------------------------------------------------------------
// API Types
// --------------------------------------------------------------------------

#[derive(Deserialize)]
struct BitbucketErrorResponse {
    error: BitbucketErrorDetail,
}

#[derive(Deserialize)]
struct BitbucketErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct BitbucketRepository {
    #[serde(default)]
    links: BitbucketRepositoryLinks,
}

#[derive(Deserialize, Default)]
struct BitbucketRepositoryLinks {
    #[serde(default)]
    clone: Vec<BitbucketLink>,
}

#[derive(Deserialize)]
struct BitbucketLink {
    href: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct BitbucketBranchingModel {
    development: Option<BitbucketModelBranch>,
    production: Option<BitbucketModelBranch>,
    #[serde(default)]
    branch_types: Vec<BitbucketBranchType>,
}

#[derive(Deserialize)]
struct BitbucketModelBranch {
    name: String,
}

#[derive(Deserialize)]
struct BitbucketBranchType {
    kind: String,
    prefix: String,
}

impl BitbucketBranchingModel {
    /// Options from the model, `None` without a release branch type.
    ///
    /// A missing development or production branch keeps the default name.
    fn into_options(self) -> Option<CascadeOptions> {
        let release = self.branch_types.into_iter().find(|bt| bt.kind == "release")?;
        let mut options = CascadeOptions {
            release_prefix: release.prefix,
            ..CascadeOptions::default()
        };
        if let Some(development) = self.development {
            options.development_name = development.name;
        }
        if let Some(production) = self.production {
            options.stable_name = production.name;
        }
        Some(options)
    }
}

#[derive(Serialize)]
struct BitbucketCreatePr<'a> {
    title: &'a str,
    description: &'a str,
    source: BitbucketBranchSpec<'a>,
    destination: BitbucketBranchSpec<'a>,
}

#[derive(Serialize)]
struct BitbucketBranchSpec<'a> {
    branch: BitbucketBranchNameRef<'a>,
}

#[derive(Serialize)]
struct BitbucketBranchNameRef<'a> {
    name: &'a str,
}

impl<'a> From<&'a CreatePrRequest> for BitbucketCreatePr<'a> {
    fn from(request: &'a CreatePrRequest) -> Self {
        Self {
            title: &request.title,
            description: &request.description,
            source: BitbucketBranchSpec {
                branch: BitbucketBranchNameRef {
                    name: &request.source,
                },
            },
            destination: BitbucketBranchSpec {
                branch: BitbucketBranchNameRef {
                    name: &request.destination,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct BitbucketPullRequest {
    id: u64,
    links: BitbucketPullRequestLinks,
}

#[derive(Deserialize)]
struct BitbucketPullRequestLinks {
    html: BitbucketHref,
}

#[derive(Deserialize)]
struct BitbucketHref {
    href: String,
}

impl From<BitbucketPullRequest> for PullRequest {
    fn from(pr: BitbucketPullRequest) -> Self {
        PullRequest {
            id: pr.id,
            url: pr.links.html.href,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str, name: &str) -> BitbucketLink {
        BitbucketLink {
            href: href.to_string(),
            name: Some(name.to_string()),
        }
    }

    mod clone_url_selection {
        use super::*;

        #[test]
        fn first_link_without_protocols() {
            let links = vec![
                link("https://bb.org/a/b.git", "https"),
                link("git@bb.org:a/b.git", "ssh"),
            ];
            assert_eq!(
                select_clone_url(&links, &[]),
                Some("https://bb.org/a/b.git".to_string())
            );
        }

        #[test]
        fn matches_requested_protocol() {
            let links = vec![
                link("https://bb.org/a/b.git", "https"),
                link("git@bb.org:a/b.git", "ssh"),
            ];
            assert_eq!(
                select_clone_url(&links, &["ssh"]),
                Some("git@bb.org:a/b.git".to_string())
            );
        }

        #[test]
        fn no_match() {
            let links = vec![link("https://bb.org/a/b.git", "https")];
            assert_eq!(select_clone_url(&links, &["ssh"]), None);
            assert_eq!(select_clone_url(&[], &[]), None);
        }
    }

    mod branching_model {
        use super::*;

        fn parse(json: &str) -> BitbucketBranchingModel {
            serde_json::from_str(json).unwrap()
        }

        #[test]
        fn full_model() {
            let model = parse(
                r#"{
                    "development": {"name": "dev"},
                    "production": {"name": "main"},
                    "branch_types": [
                        {"kind": "feature", "prefix": "feature/"},
                        {"kind": "release", "prefix": "rel-"}
                    ]
                }"#,
            );
            let options = model.into_options().unwrap();
            assert_eq!(options.development_name, "dev");
            assert_eq!(options.release_prefix, "rel-");
            assert_eq!(options.stable_name, "main");
        }

        #[test]
        fn production_absent_keeps_default_stable() {
            let model = parse(
                r#"{
                    "development": {"name": "develop"},
                    "branch_types": [{"kind": "release", "prefix": "release/"}]
                }"#,
            );
            let options = model.into_options().unwrap();
            assert_eq!(options, CascadeOptions::default());
        }

        #[test]
        fn no_release_type() {
            let model = parse(
                r#"{
                    "development": {"name": "develop"},
                    "branch_types": [{"kind": "hotfix", "prefix": "hotfix/"}]
                }"#,
            );
            assert!(model.into_options().is_none());
        }
    }

    mod bitbucket_forge {
        use super::*;

        #[test]
        fn repo_url_encodes_segments() {
            let forge = BitbucketForge::with_api_base(Credentials::default(), "https://api.example.com/2.0");
            let repo = RepoId::new("{team}", "my repo", "{uuid}");
            let url = forge.repo_url(&repo, &["branching-model"]).unwrap();
            assert_eq!(
                url.as_str(),
                "https://api.example.com/2.0/repositories/%7Bteam%7D/my%20repo/branching-model"
            );
        }

        #[test]
        fn repo_url_with_trailing_slash() {
            let forge = BitbucketForge::with_api_base(Credentials::default(), "http://127.0.0.1:9/");
            let repo = RepoId::new("acme", "app", "");
            let url = forge.repo_url(&repo, &[]).unwrap();
            assert_eq!(url.as_str(), "http://127.0.0.1:9/repositories/acme/app");
        }

        #[test]
        fn invalid_api_base() {
            let forge = BitbucketForge::with_api_base(Credentials::default(), "not a url");
            let repo = RepoId::new("acme", "app", "");
            assert!(matches!(
                forge.repo_url(&repo, &[]),
                Err(ForgeError::InvalidResponse(_))
            ));
        }

        #[test]
        fn debug_hides_password() {
            let forge = BitbucketForge::new(Credentials::new("bot", "s3cret"));
            let debug = format!("{:?}", forge);
            assert!(debug.contains("bot"));
            assert!(!debug.contains("s3cret"));
            assert_eq!(forge.name(), "bitbucket");
            assert_eq!(forge.api_base(), DEFAULT_BITBUCKET_API);
        }

        #[test]
        fn create_pr_body_shape() {
            let request = CreatePrRequest::remediation("release/1.0", "release/1.2");
            let body = serde_json::to_value(BitbucketCreatePr::from(&request)).unwrap();
            assert_eq!(body["title"], "Automatic merge failure");
            assert_eq!(body["source"]["branch"]["name"], "release/1.0");
            assert_eq!(body["destination"]["branch"]["name"], "release/1.2");
        }
    }
}
