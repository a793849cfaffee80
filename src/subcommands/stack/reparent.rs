//! `move` subcommand.

use crate::{
    continuation::OpKind,
    ctx::StContext,
    git::GitBackend,
    scope::Scope,
    subcommands::{branch_or_current, report_restacked, select_branch},
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `move` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct MoveCmd {
    /// The branch to move. Defaults to the checked-out branch.
    branch: Option<String>,
    /// The new parent. Prompts when omitted.
    #[clap(long, short)]
    onto: Option<String>,
}

impl MoveCmd {
    /// Run the `move` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = branch_or_current(ctx, self.branch)?;
        let onto = match self.onto {
            Some(onto) => onto,
            None => select_branch(ctx, &format!("Move `{}` onto", Blue.paint(&branch)))?,
        };

        let old_parent = ctx.set_parent(&branch, &onto)?;
        println!(
            "Moved `{}` from `{}` onto `{}`.",
            Blue.paint(&branch),
            Blue.paint(&old_parent),
            Blue.paint(&onto)
        );

        let restacked = ctx.restack_as(OpKind::SetParent, &branch, Scope::Upstack)?;
        report_restacked(&restacked);
        Ok(())
    }
}
