//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! listen = "0.0.0.0:5000"
//! token = "shared-secret"
//! workdir = "/var/lib/cascade-merge"
//! queue_capacity = 100
//! clone_protocol = "https"
//!
//! [credentials]
//! username = "bot"
//! password = "app-password"
//!
//! [author]
//! name = "Cascade Merge"
//! email = "cascade-merge@localhost"
//!
//! [bitbucket]
//! api_base = "https://api.bitbucket.org/2.0"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing and after environment overrides,
//! see [`ServiceConfig::validate`].

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{Author, Credentials};

/// Default bind address of the webhook endpoint.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

/// Default capacity of the event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default Bitbucket Cloud API base URL.
pub const DEFAULT_BITBUCKET_API: &str = "https://api.bitbucket.org/2.0";

/// Service configuration, read once at startup and passed to constructors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Socket address the webhook endpoint binds to.
    pub listen: String,

    /// Shared secret expected in the `token` query parameter.
    /// Empty disables the check.
    pub token: String,

    /// Root directory holding one working copy per repository.
    pub workdir: PathBuf,

    /// Capacity of the bounded event queue.
    pub queue_capacity: usize,

    /// Preferred clone transport (`https`, `ssh`).
    pub clone_protocol: String,

    /// Credentials for the hosting API and the git transport.
    pub credentials: Credentials,

    /// Identity for commits created by the service itself.
    pub author: Author,

    /// Bitbucket API settings.
    pub bitbucket: BitbucketConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            token: String::new(),
            workdir: std::env::temp_dir().join("cascade-merge"),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            clone_protocol: "https".to_string(),
            credentials: Credentials::default(),
            author: Author::default(),
            bitbucket: BitbucketConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "queue_capacity must be at least 1".into(),
            ));
        }

        if self.clone_protocol.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "clone_protocol cannot be empty".into(),
            ));
        }

        if self.bitbucket.api_base.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "bitbucket.api_base cannot be empty".into(),
            ));
        }

        Ok(())
    }

    /// Parsed bind address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::InvalidValue(format!("invalid listen address '{}'", self.listen))
        })
    }
}

/// Bitbucket Cloud API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BitbucketConfig {
    /// REST API base URL.
    pub api_base: String,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_BITBUCKET_API.to_string(),
        }
    }
}
