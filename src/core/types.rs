//! core::types
//!
//! Strong types for the cascade domain.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`BranchRef`] - Branch name plus local/remote origin
//! - [`CommitId`] - Hex commit id
//! - [`RepoId`] - Hosted repository identity (owner, name, unique id)
//! - [`CascadeOptions`] - Branching model used to build a cascade
//! - [`Credentials`] - Transport credentials, never printed
//! - [`Author`] - Identity used for commits authored by the service
//!
//! # Examples
//!
//! ```
//! use cascade_merge::core::types::{BranchName, CascadeOptions};
//!
//! let branch = BranchName::new("release/1.2").unwrap();
//! assert_eq!(branch.as_str(), "release/1.2");
//! assert!(BranchName::new("invalid..name").is_err());
//!
//! let options = CascadeOptions::default();
//! assert_eq!(options.development_name, "develop");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

/// A validated Git branch name (short form, without `refs/heads/`).
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use cascade_merge::core::types::BranchName;
///
/// let name = BranchName::new("release/1.0").unwrap();
/// assert_eq!(name.to_string(), "release/1.0");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |reason: &str| Err(TypeError::InvalidBranchName(format!("'{name}' {reason}")));

        if name.is_empty() {
            return reject("is empty");
        }
        if name == "@" {
            return reject("is reserved");
        }
        if name.starts_with('-') {
            return reject("cannot start with '-'");
        }
        if name.starts_with('/') || name.ends_with('/') {
            return reject("cannot start or end with '/'");
        }
        if name.ends_with('.') {
            return reject("cannot end with '.'");
        }
        for forbidden in ["..", "@{", "//"] {
            if name.contains(forbidden) {
                return reject(&format!("cannot contain '{forbidden}'"));
            }
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, ' ' | '~' | '^' | ':' | '\\' | '?' | '*' | '['))
        {
            return reject(&format!("cannot contain '{c}'"));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("cannot contain control characters");
        }

        // Component rules also cover a leading '.' and a trailing ".lock" on the whole name.
        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return reject("has a path component starting with '.'");
            }
            if component.ends_with(".lock") {
                return reject("has a path component ending with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full local ref name (`refs/heads/<name>`).
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for BranchName {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex object id of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    /// Wrap a hex object id (normalized to lowercase).
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form, at most `len` characters.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a branch lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOrigin {
    /// A local branch (`refs/heads/...`).
    Local,
    /// A remote-tracking branch (`refs/remotes/<remote>/...`).
    Remote,
}

/// A branch short name together with its origin.
///
/// Identity is the name alone: `origin/release/1.0` and the local
/// `release/1.0` compare equal.
#[derive(Debug, Clone)]
pub struct BranchRef {
    /// Short name with any remote prefix stripped.
    pub name: BranchName,
    /// Local or remote-tracking.
    pub origin: BranchOrigin,
}

impl BranchRef {
    /// A remote-tracking branch.
    pub fn remote(name: BranchName) -> Self {
        Self {
            name,
            origin: BranchOrigin::Remote,
        }
    }

    /// A local branch.
    pub fn local(name: BranchName) -> Self {
        Self {
            name,
            origin: BranchOrigin::Local,
        }
    }
}

impl PartialEq for BranchRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BranchRef {}

impl std::hash::Hash for BranchRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Identity of a hosted repository, as carried by webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    /// Owner or workspace identifier (Bitbucket uses a `{uuid}`).
    pub owner: String,
    /// Repository name (slug).
    pub name: String,
    /// Unique repository identifier.
    pub uuid: String,
}

impl RepoId {
    /// Create a repository identity.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            uuid: uuid.into(),
        }
    }

    /// Filesystem-safe directory name for this repository's working copy.
    ///
    /// Derived from the unique id (or `owner_name` when the id is empty).
    /// Anything other than ASCII alphanumerics, `-` and `_` is replaced, so
    /// the key never contains a path separator.
    ///
    /// # Example
    ///
    /// ```
    /// use cascade_merge::core::types::RepoId;
    ///
    /// let repo = RepoId::new("{owner}", "app", "{1234-abcd}");
    /// assert_eq!(repo.workdir_key(), "_1234-abcd_");
    /// ```
    pub fn workdir_key(&self) -> String {
        let raw = if self.uuid.trim().is_empty() {
            format!("{}_{}", self.owner, self.name)
        } else {
            self.uuid.clone()
        };
        raw.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Default development branch name.
pub const DEFAULT_DEVELOPMENT: &str = "develop";
/// Default release branch prefix.
pub const DEFAULT_RELEASE_PREFIX: &str = "release/";
/// Default stable (terminal) branch name.
pub const DEFAULT_STABLE: &str = "master";

/// Branching model that decides which branches take part in a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeOptions {
    /// Exact name of the development branch.
    pub development_name: String,
    /// Prefix shared by all release branches; the remainder is the version.
    pub release_prefix: String,
    /// Terminal branch, always the final cascade step.
    pub stable_name: String,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            development_name: DEFAULT_DEVELOPMENT.to_string(),
            release_prefix: DEFAULT_RELEASE_PREFIX.to_string(),
            stable_name: DEFAULT_STABLE.to_string(),
        }
    }
}

impl CascadeOptions {
    /// Whether merges into `destination` should be left alone.
    ///
    /// Ordinary development merges do not cascade: a destination on the
    /// development track that is not also on the release track is skipped.
    pub fn skips_destination(&self, destination: &str) -> bool {
        destination.starts_with(&self.development_name)
            && !destination.starts_with(&self.release_prefix)
    }
}

/// Username/password pair handed to transport authentication only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when no username is configured.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty()
    }
}

// Custom Debug to avoid exposing the password
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("has_password", &!self.password.is_empty())
            .finish()
    }
}

/// Commit identity used by [`crate::git::Git::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: "Cascade Merge".to_string(),
            email: "cascade-merge@localhost".to_string(),
        }
    }
}
