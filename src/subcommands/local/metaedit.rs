//! `metaedit` subcommand.

use crate::{
    ctx::StContext,
    git::GitBackend,
    subcommands::branch_or_current,
    tree::{PrInfo, ReviewState},
};
use anyhow::{anyhow, Result};
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `metaedit` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct MetaeditCmd {
    /// The branch to edit. Defaults to the checked-out branch.
    branch: Option<String>,
    /// Pull request number.
    #[clap(long, conflicts_with = "clear")]
    pr: Option<u64>,
    /// Pull request title.
    #[clap(long, requires = "pr")]
    title: Option<String>,
    /// Pull request body.
    #[clap(long, requires = "pr")]
    body: Option<String>,
    /// Mark the pull request as a draft.
    #[clap(long, requires = "pr")]
    draft: bool,
    /// Review state of the pull request.
    #[clap(long, value_enum, requires = "pr")]
    review: Option<ReviewState>,
    /// Drop the recorded pull request.
    #[clap(long)]
    clear: bool,
}

impl MetaeditCmd {
    /// Run the `metaedit` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = branch_or_current(ctx, self.branch)?;
        let pr = match (self.pr, self.clear) {
            (_, true) => None,
            (Some(number), false) => Some(PrInfo {
                number,
                title: self.title,
                body: self.body,
                is_draft: self.draft,
                review_state: self.review,
            }),
            (None, false) => return Err(anyhow!("Pass `--pr <NUMBER>` or `--clear`.")),
        };

        ctx.metaedit(&branch, pr)?;
        println!("Updated pull request metadata of `{}`.", Blue.paint(branch));
        Ok(())
    }
}
