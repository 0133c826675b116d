//! forge
//!
//! Abstraction for the hosting service a repository lives on.
//!
//! # Architecture
//!
//! The `Forge` trait defines the three calls the worker makes to the host:
//! resolve a clone URL, read the branching model, and open a remediation
//! pull request. The worker holds one `Arc<dyn Forge>` and never names a
//! concrete implementation.
//!
//! Forge failures never touch a working copy: a failed lookup skips the
//! event, a failed PR creation is logged.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`bitbucket`]: Bitbucket Cloud implementation over REST 2.0
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::forge::{bitbucket::BitbucketForge, CreatePrRequest, Forge};
//!
//! let forge = BitbucketForge::new(credentials);
//! let pr = forge
//!     .create_pr(&repo, CreatePrRequest::remediation("release/1.0", "release/1.2"))
//!     .await?;
//!
//! println!("Created PR #{}: {}", pr.id, pr.url);
//! ```

pub mod bitbucket;
pub mod mock;
mod traits;

pub use traits::*;
