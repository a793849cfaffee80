//! `submit-status` subcommand.

use crate::{
    ctx::StContext,
    git::GitBackend,
    remote::{GitRemote, RemoteSync},
};
use anyhow::Result;
use clap::Args;
use itertools::Itertools;
use nu_ansi_term::Color;
use std::sync::Arc;

/// CLI arguments for the `submit-status` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct SubmitStatusCmd;

impl SubmitStatusCmd {
    /// Run the `submit-status` subcommand.
    pub async fn run(self, ctx: &StContext<GitBackend>) -> Result<()> {
        let tracked = ctx
            .store
            .all_names()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        let sync = RemoteSync::populate_remote_shas(
            Arc::new(GitRemote::new(ctx.vcs.workdir())),
            &ctx.config.remote,
            tracked,
        )
        .await;

        let report = ctx.submit_readiness(&sync)?;
        if report.is_empty() {
            println!("No tracked branches.");
        }
        for branch in report {
            let notes = [
                branch.merged.then(|| Color::Purple.paint("merged")),
                branch.needs_restack.then(|| Color::Yellow.paint("needs restack")),
                (branch.needs_submit && !branch.merged).then(|| Color::Red.paint("needs push")),
            ]
            .into_iter()
            .flatten()
            .join(", ");
            let pr = branch
                .pr_number
                .map(|n| format!(" #{n}"))
                .unwrap_or_default();

            println!(
                "{}{} {}",
                Color::Blue.paint(&branch.name),
                pr,
                if notes.is_empty() {
                    Color::Green.paint("in sync").to_string()
                } else {
                    notes
                }
            );
        }
        Ok(())
    }
}
