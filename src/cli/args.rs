//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cascade Merge - forward-propagates merges across release branches
#[derive(Parser, Debug)]
#[command(name = "cascade-merge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive pull-request webhooks and cascade merges in the background
    Serve {
        /// Config file (default: $CASCADE_MERGE_CONFIG, then the user config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address, overriding the config file and PORT
        #[arg(long)]
        listen: Option<String>,
    },

    /// Cascade one branch forward against a local working copy
    Run {
        /// Working copy directory; cloned from --url when missing
        #[arg(long)]
        path: PathBuf,

        /// Remote URL of the repository
        #[arg(long)]
        url: String,

        /// Branch whose tip should be cascaded forward
        #[arg(long)]
        branch: String,

        /// Development branch name [default: develop]
        #[arg(long)]
        development: Option<String>,

        /// Release branch prefix [default: release/]
        #[arg(long)]
        release_prefix: Option<String>,

        /// Stable branch name [default: master]
        #[arg(long)]
        stable: Option<String>,

        /// Config file supplying credentials and commit author
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
