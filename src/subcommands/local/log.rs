//! `log` subcommand.

use crate::{ctx::StContext, git::GitBackend};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `log` subcommand.
#[derive(Debug, Default, Clone, Eq, PartialEq, Args)]
pub struct LogCmd;

impl LogCmd {
    /// Run the `log` subcommand.
    pub fn run(self, ctx: &StContext<GitBackend>) -> Result<()> {
        ctx.print_tree()?;

        let missing = ctx.missing_refs();
        if !missing.is_empty() {
            println!(
                "\n{} tracked branches no longer exist: {}. Run `stk untrack --prune` to forget them.",
                Color::Yellow.paint("warning:"),
                missing.join(", ")
            );
        }
        Ok(())
    }
}
