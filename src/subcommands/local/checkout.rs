//! `checkout` subcommand.

use crate::{ctx::StContext, git::GitBackend, subcommands::select_branch};
use anyhow::Result;
use clap::Args;

/// CLI arguments for the `checkout` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CheckoutCmd {
    /// The branch to check out. Prompts when omitted.
    branch: Option<String>,
}

impl CheckoutCmd {
    /// Run the `checkout` subcommand.
    pub fn run(self, ctx: &StContext<GitBackend>) -> Result<()> {
        let branch = match self.branch {
            Some(branch) => branch,
            None => select_branch(ctx, "Select a branch to checkout")?,
        };
        Ok(ctx.checkout(&branch)?)
    }
}
