//! `commit`, `squash` and `add` subcommands.

use crate::{
    continuation::OpKind,
    ctx::StContext,
    git::{CommitOptions, GitBackend},
    subcommands::report_restacked,
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `commit` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CommitCmd {
    /// The commit message. Opens the editor when omitted.
    #[clap(long, short)]
    message: Option<String>,
    /// Amend the tip commit.
    #[clap(long)]
    amend: bool,
    /// Stage every change first.
    #[clap(long, short)]
    all: bool,
    /// Pick hunks interactively.
    #[clap(long, short)]
    patch: bool,
}

impl CommitCmd {
    /// Run the `commit` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        if self.all {
            ctx.add_all()?;
        }
        let branch = ctx.commit(&CommitOptions {
            message: self.message,
            amend: self.amend,
            all: self.all,
            patch: self.patch,
            reuse_message: None,
        })?;

        let restacked = ctx.restack_descendants(OpKind::Commit, &branch)?;
        if !restacked.is_empty() {
            report_restacked(&restacked);
        }
        Ok(())
    }
}

/// CLI arguments for the `squash` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct SquashCmd {
    /// Message of the squashed commit. Reuses the oldest commit's message when omitted.
    #[clap(long, short)]
    message: Option<String>,
}

impl SquashCmd {
    /// Run the `squash` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = ctx.current_branch()?;
        if !ctx.squash(self.message)? {
            println!("`{}` already has a single commit.", Blue.paint(&branch));
            return Ok(());
        }
        println!("Squashed `{}`.", Blue.paint(&branch));

        let restacked = ctx.restack_descendants(OpKind::Squash, &branch)?;
        if !restacked.is_empty() {
            report_restacked(&restacked);
        }
        Ok(())
    }
}

/// CLI arguments for the `add` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AddCmd;

impl AddCmd {
    /// Run the `add` subcommand.
    pub fn run(self, ctx: &StContext<GitBackend>) -> Result<()> {
        Ok(ctx.add_all()?)
    }
}
