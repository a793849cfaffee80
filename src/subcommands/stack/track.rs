//! `track` and `untrack` subcommands.

use crate::{
    ctx::StContext,
    git::GitBackend,
    subcommands::{branch_or_current, select_branch},
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `track` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct TrackCmd {
    /// The branch to track. Defaults to the checked-out branch.
    branch: Option<String>,
    /// The parent branch. Prompts when omitted.
    #[clap(long, short)]
    parent: Option<String>,
}

impl TrackCmd {
    /// Run the `track` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = branch_or_current(ctx, self.branch)?;
        let parent = match self.parent {
            Some(parent) => parent,
            None => select_branch(ctx, &format!("Select the parent of `{}`", Blue.paint(&branch)))?,
        };

        ctx.track(&branch, &parent)?;
        let state = if ctx.is_branch_fixed(&branch)? {
            ""
        } else {
            " Run `stk restack` to bring it up to date."
        };
        println!(
            "Tracking `{}` on top of `{}`.{}",
            Blue.paint(&branch),
            Blue.paint(&parent),
            state
        );
        Ok(())
    }
}

/// CLI arguments for the `untrack` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UntrackCmd {
    /// The branch to forget, along with everything stacked on it. Defaults to the checked-out
    /// branch.
    #[clap(conflicts_with = "prune")]
    branch: Option<String>,
    /// Forget every tracked branch whose git ref was deleted.
    #[clap(long)]
    prune: bool,
}

impl UntrackCmd {
    /// Run the `untrack` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let roots = if self.prune {
            ctx.missing_refs()
        } else {
            vec![branch_or_current(ctx, self.branch)?]
        };
        if self.prune && roots.is_empty() {
            println!("Every tracked branch still exists.");
        }

        for root in roots {
            // An earlier root may already have taken this one along.
            if !ctx.store.is_tracked(&root) {
                continue;
            }
            for branch in ctx.untrack(&root)? {
                println!("Untracked `{}`.", Blue.paint(&branch.name));
            }
        }
        Ok(())
    }
}
