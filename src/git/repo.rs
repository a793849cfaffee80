//! [Vcs] implementation over a local git repository.

use super::{ChangeKind, CommitOptions, FileChange, RebaseOnto, RebaseOutcome, Vcs};
use crate::errors::{StError, StResult};
use git2::{
    build::CheckoutBuilder, BranchType, Delta, DiffFindOptions, IndexAddOption, Oid,
    Repository, RepositoryState, ResetType, Signature, Sort, Status, StatusOptions,
};
use std::{
    env,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};
use tracing::{debug, trace};

/// Author of the throwaway commits built while checking for merged patches. They are never
/// referenced by a branch.
const SYNTHETIC_AUTHOR: (&str, &str) = ("stk", "stk@localhost");

/// A git repository on disk, driven through libgit2 for reads and the `git` binary for history
/// rewriting. `git2` does not support interactive rebasing or `git cherry`.
pub struct GitBackend {
    repository: Repository,
    workdir: PathBuf,
}

impl std::fmt::Debug for GitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitBackend")
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl GitBackend {
    /// Opens the repository containing the current working directory.
    pub fn discover() -> StResult<Self> {
        Self::open(&env::current_dir()?)
    }

    /// Opens the repository containing `path`.
    pub fn open(path: &Path) -> StResult<Self> {
        let repository = Repository::discover(path)
            .map_err(|_| StError::precondition("Not in a git repository."))?;
        let workdir = repository
            .workdir()
            .ok_or_else(|| StError::precondition("Bare repositories are not supported."))?
            .to_path_buf();
        Ok(Self {
            repository,
            workdir,
        })
    }

    /// Returns the `.git` directory, where `stk` keeps its state.
    pub fn git_dir(&self) -> &Path {
        self.repository.path()
    }

    /// Returns the root of the working tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn oid(&self, revision: &str) -> StResult<Oid> {
        Ok(self.repository.revparse_single(revision)?.peel_to_commit()?.id())
    }

    /// Runs `git` with captured output.
    fn git(&self, args: &[&str]) -> StResult<Output> {
        trace!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_EDITOR", "true")
            .stdin(Stdio::null())
            .output()?;
        Ok(output)
    }

    /// Runs `git` attached to the terminal, for commands that prompt the user.
    fn git_interactive(&self, args: &[&str]) -> StResult<bool> {
        trace!(?args, "running interactive git");
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .status()?;
        Ok(status.success())
    }

    /// Runs `git`, turning a non-zero exit into [StError::ExitFailed].
    fn git_checked(&self, args: &[&str]) -> StResult<String> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(StError::ExitFailed(format!(
                "`git {}`: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Classifies a failed rebase step: a live rebase means a conflict, anything else is fatal.
    fn rebase_result(&self, succeeded: bool, stderr: &[u8]) -> StResult<RebaseOutcome> {
        if succeeded {
            return Ok(RebaseOutcome::Done);
        }
        if self.rebase_in_progress()? {
            debug!("rebase stopped on a conflict");
            return Ok(RebaseOutcome::Conflict);
        }
        Err(StError::ExitFailed(format!(
            "rebase failed: {}",
            String::from_utf8_lossy(stderr).trim()
        )))
    }

    /// Returns `true` if `git cherry` finds a patch equivalent to `head` (relative to `limit`)
    /// on `upstream`.
    fn has_equivalent_patch(&self, upstream: &str, head: &str, limit: &str) -> StResult<bool> {
        let out = self.git_checked(&["cherry", upstream, head, limit])?;
        Ok(!out.trim().is_empty() && out.lines().all(|line| line.starts_with('-')))
    }
}

impl Vcs for GitBackend {
    fn current_branch(&self) -> StResult<Option<String>> {
        let head = match self.repository.head() {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(ToOwned::to_owned))
    }

    fn local_branches(&self) -> StResult<Vec<String>> {
        self.repository
            .branches(Some(BranchType::Local))?
            .map(|b| {
                let (b, _) = b?;
                b.name()?
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| StError::precondition("Branch name is not valid UTF-8."))
            })
            .collect()
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.repository.find_branch(name, BranchType::Local).is_ok()
    }

    fn branch_sha(&self, name: &str) -> StResult<String> {
        let branch = self.repository.find_branch(name, BranchType::Local)?;
        Ok(branch.get().peel_to_commit()?.id().to_string())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> StResult<bool> {
        let (ancestor, descendant) = (self.oid(ancestor)?, self.oid(descendant)?);
        Ok(ancestor == descendant || self.repository.graph_descendant_of(descendant, ancestor)?)
    }

    fn merge_base(&self, a: &str, b: &str) -> StResult<String> {
        Ok(self.repository.merge_base(self.oid(a)?, self.oid(b)?)?.to_string())
    }

    fn commit_range(&self, base: &str, head: &str) -> StResult<Vec<String>> {
        let mut walk = self.repository.revwalk()?;
        walk.push(self.oid(head)?)?;
        walk.hide(self.oid(base)?)?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        walk.map(|oid| oid.map(|o| o.to_string()).map_err(StError::from))
            .collect()
    }

    fn commit_message(&self, sha: &str) -> StResult<String> {
        let commit = self.repository.find_commit(self.oid(sha)?)?;
        Ok(commit.message().unwrap_or_default().to_string())
    }

    fn status(&self) -> StResult<Vec<FileChange>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .renames_head_to_index(true);
        let statuses = self.repository.statuses(Some(&mut opts))?;

        let changes = statuses
            .iter()
            .filter_map(|entry| {
                let status = entry.status();
                let kind = if status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
                    ChangeKind::Renamed
                } else if status.intersects(Status::INDEX_NEW | Status::WT_NEW) {
                    ChangeKind::Added
                } else if status.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
                    ChangeKind::Deleted
                } else if status.intersects(
                    Status::INDEX_MODIFIED
                        | Status::WT_MODIFIED
                        | Status::INDEX_TYPECHANGE
                        | Status::WT_TYPECHANGE
                        | Status::CONFLICTED,
                ) {
                    ChangeKind::Modified
                } else {
                    return None;
                };
                let path = entry
                    .head_to_index()
                    .and_then(|d| d.new_file().path())
                    .or_else(|| entry.index_to_workdir().and_then(|d| d.new_file().path()))
                    .map(|p| p.to_string_lossy().into_owned())
                    .or_else(|| entry.path().map(ToOwned::to_owned))?;
                Some(FileChange { path, kind })
            })
            .collect();
        Ok(changes)
    }

    fn changed_files(&self, base: &str, head: &str) -> StResult<Vec<FileChange>> {
        let base_tree = self.repository.find_commit(self.oid(base)?)?.tree()?;
        let head_tree = self.repository.find_commit(self.oid(head)?)?.tree()?;
        let mut diff =
            self.repository
                .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)?;
        diff.find_similar(Some(DiffFindOptions::new().renames(true).copies(true)))?;

        let changes = diff
            .deltas()
            .filter_map(|delta| {
                let kind = match delta.status() {
                    Delta::Added => ChangeKind::Added,
                    Delta::Deleted => ChangeKind::Deleted,
                    Delta::Modified | Delta::Typechange => ChangeKind::Modified,
                    Delta::Renamed => ChangeKind::Renamed,
                    Delta::Copied => ChangeKind::Copied,
                    _ => return None,
                };
                let file = match kind {
                    ChangeKind::Deleted => delta.old_file(),
                    _ => delta.new_file(),
                };
                let path = file.path()?.to_string_lossy().into_owned();
                Some(FileChange { path, kind })
            })
            .collect();
        Ok(changes)
    }

    fn rebase_in_progress(&self) -> StResult<bool> {
        Ok(matches!(
            self.repository.state(),
            RepositoryState::Rebase
                | RepositoryState::RebaseInteractive
                | RepositoryState::RebaseMerge
                | RepositoryState::ApplyMailboxOrRebase
        ))
    }

    fn has_unmerged_paths(&self) -> StResult<bool> {
        let mut index = self.repository.index()?;
        index.read(true)?;
        Ok(index.has_conflicts())
    }

    fn remote_url(&self, remote: &str) -> StResult<Option<String>> {
        match self.repository.find_remote(remote) {
            Ok(remote) => Ok(remote.url().map(ToOwned::to_owned)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_merged_into(&self, branch: &str, trunk: &str) -> StResult<bool> {
        let branch_sha = self.branch_sha(branch)?;
        let trunk_sha = self.branch_sha(trunk)?;
        if self.is_ancestor(&branch_sha, &trunk_sha)? {
            return Ok(true);
        }

        // Walk the branch's own commits, squashing everything since the last point already found
        // on trunk into one synthetic commit and asking `git cherry` whether trunk has that patch.
        // This is an approximation: unrelated commits with identical patches also match.
        let base = self.merge_base(&branch_sha, &trunk_sha)?;
        let signature = Signature::now(SYNTHETIC_AUTHOR.0, SYNTHETIC_AUTHOR.1)?;
        let mut matched = self.repository.find_commit(Oid::from_str(&base)?)?;
        for sha in self.commit_range(&base, &branch_sha)? {
            let commit = self.repository.find_commit(Oid::from_str(&sha)?)?;
            if commit.tree_id() == matched.tree_id() {
                matched = commit;
                continue;
            }

            let synthetic = self.repository.commit(
                None,
                &signature,
                &signature,
                "_",
                &commit.tree()?,
                &[&matched],
            )?;
            let (synthetic, limit) = (synthetic.to_string(), matched.id().to_string());
            if self.has_equivalent_patch(&trunk_sha, &synthetic, &limit)? {
                trace!(commit = %sha, "found equivalent patch on trunk");
                matched = commit;
            }
        }
        Ok(matched.id().to_string() == branch_sha)
    }

    fn checkout(&self, name: &str) -> StResult<()> {
        let refname = format!("refs/heads/{name}");
        let target = self.repository.revparse_single(&refname)?;
        self.repository
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        self.repository.set_head(&refname)?;
        Ok(())
    }

    fn checkout_keeping_changes(&self, name: &str) -> StResult<()> {
        self.git_checked(&["checkout", name]).map(|_| ())
    }

    fn create_branch(&self, name: &str, at: &str) -> StResult<()> {
        let commit = self.repository.revparse_single(at)?.peel_to_commit()?;
        self.repository.branch(name, &commit, false)?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> StResult<()> {
        self.repository
            .find_branch(name, BranchType::Local)?
            .delete()?;
        Ok(())
    }

    fn rename_branch(&self, from: &str, to: &str) -> StResult<()> {
        self.repository
            .find_branch(from, BranchType::Local)?
            .rename(to, false)?;
        Ok(())
    }

    fn add_all(&self) -> StResult<()> {
        let mut index = self.repository.index()?;
        index.read(true)?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, opts: &CommitOptions) -> StResult<()> {
        let mut args = vec!["commit"];
        if opts.all {
            args.push("--all");
        }
        if opts.amend {
            args.push("--amend");
        }
        if opts.patch {
            args.push("--patch");
        }
        match (&opts.message, &opts.reuse_message) {
            (Some(message), _) => args.extend(["--message", message.as_str()]),
            (None, Some(sha)) => args.extend(["--reuse-message", sha.as_str()]),
            (None, None) if opts.amend => args.push("--no-edit"),
            (None, None) => {}
        }

        if opts.is_interactive() {
            if !self.git_interactive(&args)? {
                return Err(StError::ExitFailed("`git commit` did not complete.".to_string()));
            }
            return Ok(());
        }
        self.git_checked(&args).map(|_| ())
    }

    fn soft_reset(&self, sha: &str) -> StResult<()> {
        let target = self.repository.revparse_single(sha)?;
        self.repository.reset(&target, ResetType::Soft, None)?;
        Ok(())
    }

    fn rebase_onto(&self, request: &RebaseOnto) -> StResult<RebaseOutcome> {
        let RebaseOnto {
            branch,
            upstream,
            onto,
            interactive,
        } = request;
        debug!(%branch, %upstream, %onto, "rebasing");

        let mut args = vec!["rebase"];
        if *interactive {
            args.push("--interactive");
        }
        args.extend(["--onto", onto.as_str(), upstream.as_str(), branch.as_str()]);

        if *interactive {
            let succeeded = self.git_interactive(&args)?;
            return self.rebase_result(succeeded, b"interactive rebase exited with an error");
        }
        let output = self.git(&args)?;
        self.rebase_result(output.status.success(), &output.stderr)
    }

    fn rebase_continue(&self) -> StResult<RebaseOutcome> {
        let output = self.git(&["rebase", "--continue"])?;
        self.rebase_result(output.status.success(), &output.stderr)
    }

    fn rebase_abort(&self) -> StResult<()> {
        self.git_checked(&["rebase", "--abort"]).map(|_| ())
    }
}
