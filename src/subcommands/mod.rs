//! The subcommands for the `stk` application.

use crate::{ctx::StContext, git::GitBackend};
use anyhow::Result;
use clap::Subcommand;
use nu_ansi_term::Color;

mod local;
pub use local::{CheckoutCmd, InitCmd, LogCmd, MetaeditCmd, StatusCmd};

mod remote;
pub use remote::SubmitStatusCmd;

mod stack;
pub use stack::{
    AbortCmd, AddCmd, CommitCmd, ContinueCmd, CreateCmd, DeleteCmd, MoveCmd, RenameCmd,
    RestackCmd, SquashCmd, TrackCmd, UnbranchCmd, UntrackCmd,
};

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum Subcommands {
    /// Configure the trunk branches and remote for the repository.
    Init(InitCmd),
    /// Print a tree of all tracked branches.
    #[clap(aliases = ["l", "ls"])]
    Log(LogCmd),
    /// Show the checked-out branch, its place in the stack and any paused operation.
    #[clap(alias = "st")]
    Status(StatusCmd),
    /// Checkout a branch, picking from the stack tree when no name is given.
    #[clap(alias = "co")]
    Checkout(CheckoutCmd),
    /// Create a new branch on top of the checked-out branch.
    #[clap(alias = "c")]
    Create(CreateCmd),
    /// Track an existing branch on top of a parent.
    #[clap(alias = "tr")]
    Track(TrackCmd),
    /// Stop tracking a branch and everything stacked on it.
    #[clap(alias = "ut")]
    Untrack(UntrackCmd),
    /// Rebase branches onto their parents' tips.
    #[clap(aliases = ["r", "rs"])]
    Restack(RestackCmd),
    /// Resume a restack paused on a conflict.
    #[clap(alias = "cont")]
    Continue(ContinueCmd),
    /// Abandon a restack paused on a conflict.
    Abort(AbortCmd),
    /// Commit on the checked-out branch and restack its descendants.
    #[clap(alias = "ci")]
    Commit(CommitCmd),
    /// Squash the checked-out branch into one commit and restack its descendants.
    #[clap(alias = "sq")]
    Squash(SquashCmd),
    /// Stage every change in the working tree.
    #[clap(alias = "a")]
    Add(AddCmd),
    /// Move a branch onto a new parent and restack it.
    #[clap(aliases = ["mv", "set-parent"])]
    Move(MoveCmd),
    /// Fold a leaf branch's changes back into its parent's working tree, uncommitted.
    #[clap(alias = "ub")]
    Unbranch(UnbranchCmd),
    /// Delete a leaf branch.
    #[clap(aliases = ["d", "del"])]
    Delete(DeleteCmd),
    /// Rename a branch, keeping its place in the stack.
    #[clap(alias = "rn")]
    Rename(RenameCmd),
    /// Report which branches need pushing, restacking or are already merged.
    #[clap(alias = "ss")]
    SubmitStatus(SubmitStatusCmd),
    /// Edit the pull request metadata recorded for a branch.
    #[clap(alias = "meta")]
    Metaedit(MetaeditCmd),
}

impl Subcommands {
    /// Run the subcommand with the given context.
    pub async fn run(self, mut ctx: StContext<GitBackend>) -> Result<()> {
        match self {
            // Handled before a context exists.
            Self::Init(_) => Ok(()),
            Self::Log(args) => args.run(&ctx),
            Self::Status(args) => args.run(&ctx),
            Self::Checkout(args) => args.run(&ctx),
            Self::Create(args) => args.run(&mut ctx),
            Self::Track(args) => args.run(&mut ctx),
            Self::Untrack(args) => args.run(&mut ctx),
            Self::Restack(args) => args.run(&mut ctx),
            Self::Continue(args) => args.run(&mut ctx),
            Self::Abort(args) => args.run(&mut ctx),
            Self::Commit(args) => args.run(&mut ctx),
            Self::Squash(args) => args.run(&mut ctx),
            Self::Add(args) => args.run(&ctx),
            Self::Move(args) => args.run(&mut ctx),
            Self::Unbranch(args) => args.run(&mut ctx),
            Self::Delete(args) => args.run(&mut ctx),
            Self::Rename(args) => args.run(&mut ctx),
            Self::SubmitStatus(args) => args.run(&ctx).await,
            Self::Metaedit(args) => args.run(&mut ctx),
        }
    }
}

/// Resolves an optional branch argument, defaulting to the checked-out branch.
fn branch_or_current(ctx: &StContext<GitBackend>, branch: Option<String>) -> Result<String> {
    match branch {
        Some(branch) => Ok(branch),
        None => Ok(ctx.current_branch()?),
    }
}

/// Prompts the user to pick a branch from the rendered stack tree.
fn select_branch(ctx: &StContext<GitBackend>, prompt: &str) -> Result<String> {
    let branches = ctx.display_branches()?;
    let selected = inquire::Select::new(prompt, branches)
        .with_formatter(&|f| f.value.branch_name.clone())
        .prompt()?;
    Ok(selected.branch_name)
}

/// Prints the branches a restack rebased.
fn report_restacked(restacked: &[String]) {
    if restacked.is_empty() {
        println!("Every branch is already up to date with its parent.");
    }
    for branch in restacked {
        println!("Restacked `{}`.", Color::Green.paint(branch));
    }
}
