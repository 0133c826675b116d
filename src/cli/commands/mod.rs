//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! `serve` is async because it runs the HTTP server and the worker. The
//! handler builds its own tokio runtime so dispatch stays synchronous.

mod run;
mod serve;

pub use run::{run, RunArgs};
pub use serve::serve;

use super::args::Command;
use anyhow::Result;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Serve { config, listen } => serve(config.as_deref(), listen.as_deref()),
        Command::Run {
            path,
            url,
            branch,
            development,
            release_prefix,
            stable,
            config,
        } => run(RunArgs {
            path,
            url,
            branch,
            development,
            release_prefix,
            stable,
            config,
        }),
    }
}
