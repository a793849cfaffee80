//! `status` subcommand.

use crate::{ctx::StContext, git::GitBackend};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `status` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct StatusCmd;

impl StatusCmd {
    /// Run the `status` subcommand.
    pub fn run(self, ctx: &StContext<GitBackend>) -> Result<()> {
        let report = ctx.status()?;

        match (&report.current_branch, &report.parent) {
            (None, _) => println!("Not on a branch."),
            (Some(branch), _) if !report.tracked => {
                println!("On `{}`, which is not tracked.", Color::Blue.paint(branch))
            }
            (Some(branch), None) => println!("On trunk `{}`.", Color::Blue.paint(branch)),
            (Some(branch), Some(parent)) => {
                let state = if report.fixed {
                    Color::Green.paint("up to date")
                } else {
                    Color::Yellow.paint("needs restack")
                };
                println!(
                    "On `{}`, stacked on `{}` ({}).",
                    Color::Blue.paint(branch),
                    Color::Blue.paint(parent),
                    state
                );
            }
        }

        if let Some(frame) = &report.paused {
            println!(
                "{} `{}` is paused on `{}`; {} branch(es) left. Run `stk continue` or `stk abort`.",
                Color::Yellow.bold().paint("paused:"),
                frame.op_kind,
                frame.current_branch().unwrap_or_default(),
                frame.remaining_branches.len()
            );
        } else if report.rebase_in_progress {
            println!(
                "{} a git rebase is in progress.",
                Color::Yellow.bold().paint("note:")
            );
        }

        if report.changes.is_empty() {
            println!("Nothing to commit.");
        }
        for change in &report.changes {
            println!("  {} {}", Color::Red.paint(change.kind.to_string()), change.path);
        }
        Ok(())
    }
}
