//! cli
//!
//! Command-line interface layer for Cascade Merge.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialise logging once
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. `serve` wires configuration into the worker and
//! the HTTP server; `run` drives the [`crate::engine`] once, synchronously.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);
    commands::dispatch(cli.command)
}

/// Install the global subscriber. `RUST_LOG` wins over `debug`.
pub fn init_tracing(debug: bool) {
    let default = if debug {
        "cascade_merge=debug"
    } else {
        "cascade_merge=info"
    };

    // A second initialisation (e.g. in tests) is ignored.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
