//! `rename` subcommand.

use crate::{ctx::StContext, git::GitBackend, subcommands::branch_or_current};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `rename` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct RenameCmd {
    /// The new name.
    new_name: String,
    /// The branch to rename. Defaults to the checked-out branch.
    #[clap(long, short)]
    branch: Option<String>,
}

impl RenameCmd {
    /// Run the `rename` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = branch_or_current(ctx, self.branch)?;
        ctx.rename_branch(&branch, &self.new_name)?;
        println!("Renamed `{}` to `{}`.", Blue.paint(&branch), Blue.paint(&self.new_name));
        Ok(())
    }
}
