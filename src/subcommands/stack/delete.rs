//! `delete` and `unbranch` subcommands.

use crate::{
    ctx::StContext,
    git::GitBackend,
    subcommands::{branch_or_current, select_branch},
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `delete` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct DeleteCmd {
    /// The branch to delete. Prompts when omitted.
    branch: Option<String>,
    /// Skip the confirmation prompt.
    #[clap(long, short)]
    force: bool,
}

impl DeleteCmd {
    /// Run the `delete` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = match self.branch {
            Some(branch) => branch,
            None => select_branch(ctx, "Select a branch to delete")?,
        };

        // Ask for confirmation to prevent accidental deletion of local refs.
        if !self.force {
            let confirm = inquire::Confirm::new(
                format!("Delete branch `{}`?", Blue.paint(&branch)).as_str(),
            )
            .with_default(false)
            .prompt()?;
            if !confirm {
                return Ok(());
            }
        }

        ctx.delete(&branch)?;
        println!("Deleted `{}`.", Blue.paint(&branch));
        Ok(())
    }
}

/// CLI arguments for the `unbranch` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UnbranchCmd {
    /// The leaf branch to fold away. Defaults to the checked-out branch.
    branch: Option<String>,
}

impl UnbranchCmd {
    /// Run the `unbranch` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = branch_or_current(ctx, self.branch)?;
        ctx.unbranch(&branch)?;
        println!(
            "Removed `{}`. Its changes are staged on `{}`.",
            Blue.paint(&branch),
            Blue.paint(ctx.current_branch()?)
        );
        Ok(())
    }
}
