//! `restack`, `continue` and `abort` subcommands.

use crate::{
    ctx::StContext,
    git::GitBackend,
    scope::Scope,
    subcommands::{branch_or_current, report_restacked},
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `restack` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct RestackCmd {
    /// The branch the scope is relative to. Defaults to the checked-out branch.
    branch: Option<String>,
    /// Which branches to restack.
    #[clap(long, short, value_enum, default_value_t = Scope::Upstack)]
    pub(crate) scope: Scope,
}

impl RestackCmd {
    /// Run the `restack` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let branch = branch_or_current(ctx, self.branch)?;
        let restacked = ctx.restack(&branch, self.scope)?;
        report_restacked(&restacked);
        Ok(())
    }
}

/// CLI arguments for the `continue` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct ContinueCmd;

impl ContinueCmd {
    /// Run the `continue` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let restacked = ctx.continue_restack()?;
        report_restacked(&restacked);
        Ok(())
    }
}

/// CLI arguments for the `abort` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AbortCmd;

impl AbortCmd {
    /// Run the `abort` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let frame = ctx.abort_restack()?;
        println!(
            "Aborted `{}`. {} branch(es) were left as they were.",
            frame.op_kind,
            Color::Yellow.paint(frame.remaining_branches.len().to_string())
        );
        Ok(())
    }
}
