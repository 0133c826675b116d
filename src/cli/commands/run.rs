//! cli::commands::run
//!
//! One-shot cascade against a local working copy, without the hosting API.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::core::config::Config;
use crate::core::types::{BranchName, CascadeOptions};
use crate::engine::{CascadeReport, CascadeRunner, HopOutcome};
use crate::git::{Git, OpenMode};

/// Arguments of `cascade-merge run`.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub path: PathBuf,
    pub url: String,
    pub branch: String,
    pub development: Option<String>,
    pub release_prefix: Option<String>,
    pub stable: Option<String>,
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Cascade options from the defaults and any overriding flags.
    pub fn options(&self) -> CascadeOptions {
        let defaults = CascadeOptions::default();
        CascadeOptions {
            development_name: self
                .development
                .clone()
                .unwrap_or(defaults.development_name),
            release_prefix: self
                .release_prefix
                .clone()
                .unwrap_or(defaults.release_prefix),
            stable_name: self.stable.clone().unwrap_or(defaults.stable_name),
        }
    }
}

/// Run one cascade and print its hops.
///
/// # Errors
///
/// Fails when the config cannot be loaded, the branch name is invalid, the
/// working copy cannot be opened or cloned, or the cascade stops early.
pub fn run(args: RunArgs) -> Result<()> {
    let loaded = Config::load(args.config.as_deref()).context("loading configuration")?;
    let config = loaded.config;

    let trigger = BranchName::new(args.branch.as_str())
        .with_context(|| format!("invalid branch '{}'", args.branch))?;
    let options = args.options();

    if let Some(parent) = args.path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let (git, mode) = Git::open_or_clone(
        &args.path,
        &args.url,
        config.credentials.clone(),
        config.author.clone(),
    )?;
    if mode == OpenMode::Cloned {
        println!("Cloned {} into {}", args.url, args.path.display());
    }

    match CascadeRunner::new(&git).run(&trigger, &options) {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(failure) => {
            bail!("{failure}");
        }
    }
}

fn print_report(report: &CascadeReport) {
    if report.hops.is_empty() {
        println!("Nothing to cascade from {}", report.trigger);
        return;
    }

    println!("Cascaded {}:", report.trigger);
    for hop in &report.hops {
        match &hop.outcome {
            HopOutcome::Merged { commit } => {
                println!("  {} -> {}  merged {}", hop.source, hop.target, commit.short(7))
            }
            HopOutcome::UpToDate => {
                println!("  {} -> {}  up to date", hop.source, hop.target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            path: PathBuf::from("/tmp/wc"),
            url: "/srv/app.git".into(),
            branch: "release/1.0".into(),
            development: None,
            release_prefix: None,
            stable: None,
            config: None,
        }
    }

    #[test]
    fn options_default() {
        assert_eq!(args().options(), CascadeOptions::default());
    }

    #[test]
    fn options_overridden() {
        let options = RunArgs {
            development: Some("dev".into()),
            release_prefix: Some("rel-".into()),
            stable: Some("main".into()),
            ..args()
        }
        .options();
        assert_eq!(options.development_name, "dev");
        assert_eq!(options.release_prefix, "rel-");
        assert_eq!(options.stable_name, "main");
    }
}
