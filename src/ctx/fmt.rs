//! Contains the log and formatting logic for the [StContext] struct.

use super::StContext;
use crate::{
    config::RepoIdentity,
    constants::{
        BOTTOM_LEFT_BOX, COLORS, EMPTY_CIRCLE, FILLED_CIRCLE, HORIZONTAL_BOX, LEFT_FORK_BOX,
        VERTICAL_BOX,
    },
    errors::StResult,
    git::Vcs,
    tree::{PrInfo, ReviewState},
};
use anyhow::{anyhow, Result};
use itertools::{Itertools, Position};
use nu_ansi_term::Color;
use std::fmt::{Display, Write};

/// One tracked branch as the log reports it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogEntry {
    /// The branch name.
    pub name: String,
    /// The parent branch, [None] for trunks.
    pub parent: Option<String>,
    /// Distance from the trunk. Trunks are at depth 0.
    pub depth: usize,
    /// Whether the branch sits on its parent's tip.
    pub fixed: bool,
    /// Pull request metadata, if any was recorded.
    pub pr: Option<PrInfo>,
    /// Whether the branch is checked out.
    pub is_current: bool,
}

/// Per-render state shared by every line of the tree.
struct TreeStyle {
    checked_out: Option<String>,
    identity: Option<RepoIdentity>,
}

impl<V: Vcs> StContext<V> {
    /// Lists every trunk and tracked branch, each trunk followed by its stacks in the order they
    /// are drawn in the log.
    pub fn log_entries(&self) -> StResult<Vec<LogEntry>> {
        let checked_out = self.vcs.current_branch()?;
        let tree = self.store.tree();

        let names = self
            .config
            .trunks
            .iter()
            .flat_map(|trunk| std::iter::once(trunk.clone()).chain(tree.descendants(trunk)));
        names
            .map(|name| -> StResult<LogEntry> {
                let branch = self.store.get(&name)?;
                Ok(LogEntry {
                    depth: tree.ancestors(&name).len(),
                    // A missing ref cannot be compared against; report it as stale.
                    fixed: self.is_branch_fixed(&name).unwrap_or_default(),
                    is_current: checked_out.as_deref() == Some(name.as_str()),
                    parent: branch.parent_name,
                    pr: branch.pr_info,
                    name,
                })
            })
            .collect()
    }

    /// Gathers an in-order list of [DisplayBranch]es, containing the log-line and branch name.
    ///
    /// This function is particularly useful when creating prompts with [inquire::Select].
    pub fn display_branches(&self) -> Result<Vec<DisplayBranch>> {
        let entries = self.log_entries()?;

        let mut buf = String::new();
        self.write_tree(&mut buf)?;
        let log_lines = buf.lines().filter(|l| !l.is_empty()).collect::<Vec<_>>();

        if entries.len() != log_lines.len() {
            return Err(anyhow!(
                "Mismatch between branches and log-lines: {} branches, {} log-lines",
                entries.len(),
                log_lines.len()
            ));
        }

        Ok(entries
            .into_iter()
            .zip(log_lines)
            .map(|(entry, line)| DisplayBranch {
                display_value: line.to_string(),
                branch_name: entry.name,
            })
            .collect())
    }

    /// Prints the tree of branches contained within the [StContext].
    pub fn print_tree(&self) -> Result<()> {
        let mut buf = String::new();
        self.write_tree(&mut buf)?;
        print!("{}", buf);
        Ok(())
    }

    /// Writes the tree of branches contained within the [StContext] to the given [Write]r.
    pub fn write_tree<W: Write>(&self, w: &mut W) -> Result<()> {
        let remote_url = self.vcs.remote_url(&self.config.remote)?;
        let style = TreeStyle {
            checked_out: self.vcs.current_branch()?,
            identity: self.config.identity(remote_url.as_deref()),
        };
        for trunk in &self.config.trunks {
            self.write_tree_recursive(w, &style, trunk, 0, "", "", true)?;
        }
        Ok(())
    }

    /// Writes the tree of branches to the given writer recursively.
    #[allow(clippy::too_many_arguments)]
    fn write_tree_recursive<W: Write>(
        &self,
        w: &mut W,
        style: &TreeStyle,
        branch: &str,
        depth: usize,
        prefix: &str,
        connection: &str,
        is_parent_last_child: bool,
    ) -> Result<()> {
        let current = self.store.get(branch)?;

        // Form the log-line for the current branch.
        let checked_out_icon = if style.checked_out.as_deref() == Some(branch) {
            FILLED_CIRCLE
        } else {
            EMPTY_CIRCLE
        };
        let rendered_branch = COLORS[depth % COLORS.len()]
            .paint(format!("{}{} {}", connection, checked_out_icon, branch));
        let needs_restack = if self.is_branch_fixed(branch).unwrap_or_default() {
            ""
        } else {
            " (needs restack)"
        };
        let pull_request = current
            .pr_info
            .as_ref()
            .map(|pr| format!(" ({})", pr_annotation(pr, style.identity.as_ref())))
            .unwrap_or_default();

        writeln!(w, "{}{}{}{}", prefix, rendered_branch, needs_restack, pull_request)?;

        let children = self
            .store
            .tree()
            .children(branch)
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        for (position, child) in children.into_iter().with_position() {
            // Form the connection between the previous log-line and the current log-line.
            let is_last_child = matches!(position, Position::Last | Position::Only);
            let connection = format!(
                "{}{}",
                if is_last_child { BOTTOM_LEFT_BOX } else { LEFT_FORK_BOX },
                HORIZONTAL_BOX
            );

            let prefix = if depth == 0 {
                prefix.to_string()
            } else if is_parent_last_child {
                format!("{}  ", prefix)
            } else {
                let color = COLORS[depth % COLORS.len()];
                format!("{}{} ", prefix, color.paint(VERTICAL_BOX.to_string()))
            };

            self.write_tree_recursive(
                w,
                style,
                &child,
                depth + 1,
                &prefix,
                &connection,
                is_last_child,
            )?;
        }

        Ok(())
    }
}

/// Renders the pull request link and its state, e.g. `#12, draft, approved`.
fn pr_annotation(pr: &PrInfo, identity: Option<&RepoIdentity>) -> String {
    let link = match identity {
        Some(id) => Color::Cyan.italic().paint(format!(
            "https://{}/{}/{}/pull/{}",
            id.hostname, id.owner, id.name, pr.number
        )),
        None => Color::Cyan.italic().paint(format!("#{}", pr.number)),
    };
    let review = pr.review_state.map(|state| match state {
        ReviewState::Approved => Color::Green.paint("approved"),
        ReviewState::ChangesRequested => Color::Red.paint("changes requested"),
        ReviewState::ReviewRequired => Color::Yellow.paint("review required"),
    });

    std::iter::once(link.to_string())
        .chain(pr.is_draft.then(|| Color::DarkGray.paint("draft").to_string()))
        .chain(review.map(|r| r.to_string()))
        .join(", ")
}

/// A pair of a log-line and a branch name, which implements [Display].
#[derive(Debug)]
pub struct DisplayBranch {
    /// The log-line to display.
    pub(crate) display_value: String,
    /// The branch name corresponding to the log-line.
    pub branch_name: String,
}

impl Display for DisplayBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_value)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        git::Vcs,
        test_utils::linear_stack,
        tree::{PrInfo, ReviewState},
    };

    #[test]
    fn log_reports_parents_depth_and_fixedness() {
        let (_dir, mut ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.branch_off("side", "main");
        ctx.track("side", "main").unwrap();
        ctx.vcs.amend("a");
        ctx.vcs.checkout("b").unwrap();

        let entries = ctx.log_entries().unwrap();
        let summary = entries
            .iter()
            .map(|e| (e.name.as_str(), e.parent.as_deref(), e.depth, e.fixed, e.is_current))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("main", None, 0, true, false),
                ("a", Some("main"), 1, true, false),
                ("b", Some("a"), 2, false, true),
                ("side", Some("main"), 1, true, false),
            ]
        );
    }

    #[test]
    fn tree_lines_pair_with_branches() {
        let (_dir, mut ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.amend("a");
        ctx.metaedit(
            "a",
            Some(PrInfo {
                number: 42,
                review_state: Some(ReviewState::Approved),
                ..Default::default()
            }),
        )
        .unwrap();

        let branches = ctx.display_branches().unwrap();
        assert_eq!(
            branches.iter().map(|b| b.branch_name.as_str()).collect::<Vec<_>>(),
            vec!["main", "a", "b"]
        );
        assert!(branches[1].to_string().contains("https://github.com/o/r/pull/42"));
        assert!(branches[1].to_string().contains("approved"));
        assert!(!branches[1].to_string().contains("needs restack"));
        assert!(branches[2].to_string().contains("(needs restack)"));
    }
}
