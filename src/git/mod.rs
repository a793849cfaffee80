//! The version-control backend consumed by the `stk` engine.
//!
//! Everything the engine asks of git goes through the [Vcs] trait. [GitBackend] implements it for
//! a real repository; tests substitute a scripted fake.

use crate::errors::StResult;

mod repo;
pub use repo::GitBackend;
#[cfg(test)]
pub(crate) use repo::test as repo_test;

/// The result of a rebase step that did not fail outright.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RebaseOutcome {
    /// The rebase finished and the branch points at the rewritten history.
    Done,
    /// The rebase stopped on a conflict and is still in progress in the working directory.
    Conflict,
}

/// A `git rebase --onto <onto> <upstream> <branch>` request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RebaseOnto {
    /// The branch whose commits move.
    pub branch: String,
    /// Exclusive lower bound; commits reachable from it are not replayed.
    pub upstream: String,
    /// The new base.
    pub onto: String,
    /// Whether the user edits the todo list.
    pub interactive: bool,
}

/// Options for creating a commit on the checked-out branch.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CommitOptions {
    /// The commit message. The editor opens when absent, unless amending or reusing a message.
    pub message: Option<String>,
    /// Amend the tip commit instead of adding a new one.
    pub amend: bool,
    /// Stage every tracked and untracked change first.
    pub all: bool,
    /// Pick hunks interactively.
    pub patch: bool,
    /// Reuse the message (and authorship) of this commit.
    pub reuse_message: Option<String>,
}

impl CommitOptions {
    /// Returns `true` if git needs the terminal to complete the commit.
    pub fn is_interactive(&self) -> bool {
        self.patch || (self.message.is_none() && self.reuse_message.is_none() && !self.amend)
    }
}

/// How a file differs between two states.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
        };
        write!(f, "{code}")
    }
}

/// One entry of a status or diff listing.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FileChange {
    /// Path relative to the repository root, after any rename or copy.
    pub path: String,
    /// The kind of change.
    pub kind: ChangeKind,
}

/// The operations the engine needs from a version-control backend.
///
/// Every call is synchronous. Mutating calls must never overlap; the engine drives them one at a
/// time. A conflict is reported as [RebaseOutcome::Conflict], never as an error.
pub trait Vcs {
    /// Returns the name of the checked-out branch, or [None] on a detached `HEAD`.
    fn current_branch(&self) -> StResult<Option<String>>;

    /// Returns the names of all local branches.
    fn local_branches(&self) -> StResult<Vec<String>>;

    /// Returns `true` if a local branch called `name` exists.
    fn branch_exists(&self, name: &str) -> bool;

    /// Returns the tip commit of the local branch `name`.
    fn branch_sha(&self, name: &str) -> StResult<String>;

    /// Returns `true` if `ancestor` is reachable from `descendant`. A commit is its own ancestor.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> StResult<bool>;

    /// Returns the best common ancestor of two revisions.
    fn merge_base(&self, a: &str, b: &str) -> StResult<String>;

    /// Returns the commits reachable from `head` but not from `base`, oldest first.
    fn commit_range(&self, base: &str, head: &str) -> StResult<Vec<String>>;

    /// Returns the full message of a commit.
    fn commit_message(&self, sha: &str) -> StResult<String>;

    /// Lists uncommitted changes in the index and working tree.
    fn status(&self) -> StResult<Vec<FileChange>>;

    /// Lists the files that differ between two revisions, with renames and copies detected.
    fn changed_files(&self, base: &str, head: &str) -> StResult<Vec<FileChange>>;

    /// Returns `true` if a rebase is in progress in the working directory.
    fn rebase_in_progress(&self) -> StResult<bool>;

    /// Returns `true` if the index still holds unresolved conflicts.
    fn has_unmerged_paths(&self) -> StResult<bool>;

    /// Returns the fetch URL of `remote`, if it is configured.
    fn remote_url(&self, remote: &str) -> StResult<Option<String>>;

    /// Returns `true` if every change on `branch` already exists on `trunk`, either by ancestry
    /// or as an equivalent patch (squash and rebase merges).
    fn is_merged_into(&self, branch: &str, trunk: &str) -> StResult<bool>;

    /// Checks out the local branch `name`, refusing to clobber local changes.
    fn checkout(&self, name: &str) -> StResult<()>;

    /// Switches to `name`, carrying staged and unstaged changes along.
    fn checkout_keeping_changes(&self, name: &str) -> StResult<()>;

    /// Creates the local branch `name` at revision `at`.
    fn create_branch(&self, name: &str, at: &str) -> StResult<()>;

    /// Deletes the local branch `name`.
    fn delete_branch(&self, name: &str) -> StResult<()>;

    /// Renames the local branch `from` to `to`.
    fn rename_branch(&self, from: &str, to: &str) -> StResult<()>;

    /// Stages every change in the working tree, deletions included.
    fn add_all(&self) -> StResult<()>;

    /// Commits on the checked-out branch.
    fn commit(&self, opts: &CommitOptions) -> StResult<()>;

    /// Moves the checked-out branch to `sha`, keeping the difference staged.
    fn soft_reset(&self, sha: &str) -> StResult<()>;

    /// Replays `upstream..branch` onto `onto`.
    fn rebase_onto(&self, request: &RebaseOnto) -> StResult<RebaseOutcome>;

    /// Continues the in-progress rebase after conflicts were resolved.
    fn rebase_continue(&self) -> StResult<RebaseOutcome>;

    /// Aborts the in-progress rebase, restoring the branch it started on.
    fn rebase_abort(&self) -> StResult<()>;
}
