//! The CLI for `stk`.

use crate::{
    config::RepoConfig,
    ctx::StContext,
    git::GitBackend,
    subcommands::{InitCmd, Subcommands},
};
use anyhow::{anyhow, Result};
use clap::{
    builder::styling::{AnsiColor, Color, Style},
    ArgAction, Parser,
};
use tracing::{debug, Level};

const ABOUT: &str = "stk keeps stacks of dependent git branches in sync with each other.";

/// The CLI application for `stk`.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
#[command(about = ABOUT, version, styles = cli_styles())]
pub struct Cli {
    /// Verbosity level (0-4)
    #[arg(short, action = ArgAction::Count, global = true)]
    pub v: u8,
    /// The subcommand to run. Prints the stack tree when omitted.
    #[clap(subcommand)]
    pub subcommand: Option<Subcommands>,
}

impl Cli {
    /// Run the CLI application with the given arguments.
    pub async fn run(self) -> Result<()> {
        let cli = self.init_tracing_subscriber()?;

        let backend = GitBackend::discover()?;
        let git_dir = backend.git_dir().to_path_buf();
        debug!(git_dir = %git_dir.display(), "discovered repository");

        let subcommand = match cli.subcommand {
            Some(Subcommands::Init(args)) => return args.run(&backend),
            other => other,
        };

        let config = match RepoConfig::try_load(&git_dir)? {
            Some(config) => config,
            None => InitCmd::default().run_with(&backend)?,
        };
        let ctx = StContext::load(backend, config, &git_dir)?;

        subcommand
            .unwrap_or_else(|| Subcommands::Log(Default::default()))
            .run(ctx)
            .await
    }

    /// Initializes the tracing subscriber
    ///
    /// # Returns
    /// - `Result<()>` - Ok if successful, Err otherwise.
    pub(crate) fn init_tracing_subscriber(self) -> Result<Self> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match self.v {
                0 => Level::ERROR,
                1 => Level::WARN,
                2 => Level::INFO,
                3 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))?;

        Ok(self)
    }
}

/// Help output colors, matching the palette of the stack tree.
const fn cli_styles() -> clap::builder::Styles {
    const fn ansi(color: AnsiColor) -> Style {
        Style::new().fg_color(Some(Color::Ansi(color)))
    }

    clap::builder::Styles::styled()
        .header(ansi(AnsiColor::Cyan).bold())
        .usage(ansi(AnsiColor::Cyan).bold())
        .literal(ansi(AnsiColor::Blue).bold())
        .placeholder(ansi(AnsiColor::BrightBlack))
        .valid(ansi(AnsiColor::Green))
        .invalid(ansi(AnsiColor::Yellow).bold())
        .error(ansi(AnsiColor::Red).bold())
}

#[cfg(test)]
mod test {
    use super::Cli;
    use crate::{scope::Scope, subcommands::Subcommands};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_is_styled() {
        let help = Cli::command().render_help().ansi().to_string();
        assert!(help.contains("\x1b["));
        assert!(help.contains("restack"));
    }

    #[test]
    fn parses_restack_scope_and_verbosity() {
        let cli = Cli::try_parse_from(["stk", "-vv", "restack", "--scope", "upstack-exclusive"])
            .unwrap();
        assert_eq!(cli.v, 2);
        let Some(Subcommands::Restack(args)) = cli.subcommand else {
            panic!("expected restack");
        };
        assert_eq!(args.scope, Scope::UpstackExclusive);
    }

    #[test]
    fn aliases_resolve() {
        for (alias, expected) in [("co", "checkout"), ("c", "create"), ("ls", "log")] {
            let cli = Cli::try_parse_from(["stk", alias]).unwrap();
            let name = match cli.subcommand {
                Some(Subcommands::Checkout(_)) => "checkout",
                Some(Subcommands::Create(_)) => "create",
                Some(Subcommands::Log(_)) => "log",
                other => panic!("unexpected {other:?}"),
            };
            assert_eq!(name, expected);
        }
    }
}
