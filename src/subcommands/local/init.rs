//! `init` subcommand.

use crate::{
    config::RepoConfig,
    git::{GitBackend, Vcs},
};
use anyhow::{anyhow, Result};
use clap::Args;
use inquire::Select;
use itertools::Itertools;
use nu_ansi_term::Color::Blue;

const SELECT_TRUNK: &str =
    "Repo not configured with `stk`. Select the trunk branch for the repository.";

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Default, Clone, Eq, PartialEq, Args)]
pub struct InitCmd {
    /// Trunk branch. Repeat for repositories with several long-lived trunks.
    #[clap(long = "trunk", short)]
    trunks: Vec<String>,
    /// The remote pull requests are opened against.
    #[clap(long)]
    remote: Option<String>,
}

impl InitCmd {
    /// Run the `init` subcommand.
    pub fn run(self, backend: &GitBackend) -> Result<()> {
        let config = self.run_with(backend)?;
        println!(
            "Configured `stk` with trunk {}.",
            config.trunks.iter().map(|t| Blue.paint(t)).join(", ")
        );
        Ok(())
    }

    /// Writes the repository config, prompting for the trunk when none was passed.
    pub(crate) fn run_with(self, backend: &GitBackend) -> Result<RepoConfig> {
        let trunks = if self.trunks.is_empty() {
            let branches = backend.local_branches()?;
            if branches.is_empty() {
                return Err(anyhow!("The repository has no branches yet. Make a commit first."));
            }
            vec![Select::new(SELECT_TRUNK, branches).prompt()?]
        } else {
            self.trunks
        };

        let mut config = RepoConfig::new(backend.git_dir(), trunks)?;
        if let Some(remote) = self.remote {
            config.remote = remote;
        }
        config.save()?;
        Ok(config)
    }
}
