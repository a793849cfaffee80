//! `create` subcommand.

use crate::{
    ctx::StContext,
    git::{CommitOptions, GitBackend},
};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `create` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CreateCmd {
    /// Name of the new branch. Prompts when omitted.
    name: Option<String>,
    /// Commit the staged changes on the new branch with this message.
    #[clap(long, short)]
    message: Option<String>,
    /// Stage every change first and commit it on the new branch.
    #[clap(long, short)]
    all: bool,
}

impl CreateCmd {
    /// Run the `create` subcommand.
    pub fn run(self, ctx: &mut StContext<GitBackend>) -> Result<()> {
        let name = match self.name {
            Some(name) => name,
            None => inquire::Text::new("Name of new branch:").prompt()?,
        };
        let commit = (self.all || self.message.is_some()).then(|| CommitOptions {
            message: self.message,
            all: self.all,
            ..Default::default()
        });
        if self.all {
            ctx.add_all()?;
        }

        let parent = ctx.current_branch()?;
        ctx.create(&name, commit.as_ref())?;
        println!(
            "Created and tracked `{}` on top of `{}`.",
            Blue.paint(&name),
            Blue.paint(&parent)
        );
        Ok(())
    }
}
