//! Operations that change the stack graph or move a branch tip.
//!
//! Anything here that moves a tip leaves the branch's descendants unfixed. Callers follow up with
//! [StContext::restack_descendants].

use super::StContext;
use crate::{
    errors::{StError, StResult},
    git::{CommitOptions, Vcs},
    store::BranchUpdate,
    tree::{PrInfo, TrackedBranch},
};
use tracing::{debug, info, warn};

impl<V: Vcs> StContext<V> {
    /// Starts tracking the existing local branch `branch` on top of `parent`.
    ///
    /// The recorded parent commit is the merge-base of the two, so a branch whose parent has
    /// moved on since it was cut is tracked as needing a restack.
    pub fn track(&mut self, branch: &str, parent: &str) -> StResult<()> {
        self.ensure_idle()?;
        if self.store.is_trunk(branch) {
            return Err(StError::precondition(format!(
                "`{branch}` is a trunk branch and is always tracked."
            )));
        }
        if self.store.is_tracked(branch) {
            return Err(StError::precondition(format!(
                "`{branch}` is already tracked. Use `stk move` to change its parent."
            )));
        }
        if !self.vcs.branch_exists(branch) {
            return Err(StError::precondition(format!(
                "No local branch named `{branch}`."
            )));
        }

        let parent_sha = self.vcs.merge_base(branch, parent)?;
        self.store.upsert(
            branch,
            BranchUpdate {
                parent: Some(parent.to_string()),
                parent_sha: Some(parent_sha),
                ..Default::default()
            },
        )?;
        info!(%branch, %parent, "tracked");
        Ok(())
    }

    /// Forgets `branch` and every branch stacked on it. Git refs are left alone.
    ///
    /// ## Returns
    /// - `Ok(Vec<TrackedBranch>)` - The removed records, children before parents.
    pub fn untrack(&mut self, branch: &str) -> StResult<Vec<TrackedBranch>> {
        self.ensure_idle()?;
        self.non_trunk(branch)?;
        let mut doomed = vec![branch.to_string()];
        doomed.extend(self.store.tree().descendants(branch));

        doomed
            .iter()
            .rev()
            .map(|name| {
                debug!(branch = %name, "untracking");
                self.store.remove(name)
            })
            .collect()
    }

    /// Creates `name` on top of the checked-out branch, tracks it and checks it out. With
    /// `commit`, the pending changes are committed on the new branch.
    pub fn create(&mut self, name: &str, commit: Option<&CommitOptions>) -> StResult<()> {
        self.ensure_idle()?;
        let current = self.current_branch()?;
        self.store.get(&current)?;
        if self.vcs.branch_exists(name) || self.store.is_tracked(name) {
            return Err(StError::precondition(format!(
                "A branch named `{name}` already exists."
            )));
        }

        let tip = self.vcs.branch_sha(&current)?;
        self.vcs.create_branch(name, &tip)?;
        let update = BranchUpdate {
            parent: Some(current.clone()),
            parent_sha: Some(tip),
            ..Default::default()
        };
        if let Err(e) = self.store.upsert(name, update) {
            self.vcs.delete_branch(name)?;
            return Err(e);
        }
        self.vcs.checkout(name)?;
        info!(branch = %name, parent = %current, "created");

        if let Some(opts) = commit {
            self.vcs.commit(opts)?;
        }
        Ok(())
    }

    /// Commits on the checked-out branch.
    ///
    /// ## Returns
    /// - `Ok(String)` - The branch whose tip moved.
    pub fn commit(&mut self, opts: &CommitOptions) -> StResult<String> {
        self.ensure_idle()?;
        let current = self.current_branch()?;
        self.vcs.commit(opts)?;
        Ok(current)
    }

    /// Stages every change in the working tree.
    pub fn add_all(&self) -> StResult<()> {
        self.ensure_idle()?;
        self.vcs.add_all()
    }

    /// Squashes the checked-out branch's own commits into one. Without a message, the oldest
    /// commit's message is reused.
    ///
    /// ## Returns
    /// - `Ok(true)` - The branch was rewritten.
    /// - `Ok(false)` - There was nothing to squash.
    pub fn squash(&mut self, message: Option<String>) -> StResult<bool> {
        self.ensure_idle()?;
        let current = self.current_branch()?;
        self.non_trunk(&current)?;
        let base = self.branch_base(&current)?;
        let tip = self.vcs.branch_sha(&current)?;
        let commits = self.vcs.commit_range(&base, &tip)?;
        let Some(oldest) = commits.first().cloned() else {
            return Err(StError::precondition(format!(
                "`{current}` has no commits of its own to squash."
            )));
        };
        if commits.len() == 1 && message.is_none() {
            return Ok(false);
        }

        self.vcs.soft_reset(&base)?;
        let opts = CommitOptions {
            reuse_message: message.is_none().then_some(oldest),
            message,
            ..Default::default()
        };
        if let Err(e) = self.vcs.commit(&opts) {
            warn!(branch = %current, %tip, "squash commit failed; restoring the branch");
            self.vcs.soft_reset(&tip)?;
            return Err(e);
        }
        info!(branch = %current, count = commits.len(), "squashed");
        Ok(true)
    }

    /// Re-parents `branch` onto `new_parent`. The commits do not move until the branch is
    /// restacked, and the old recorded parent commit is kept so that only the branch's own
    /// commits move then.
    ///
    /// ## Returns
    /// - `Ok(String)` - The previous parent.
    pub fn set_parent(&mut self, branch: &str, new_parent: &str) -> StResult<String> {
        self.ensure_idle()?;
        let (_, old_parent) = self.non_trunk(branch)?;
        self.store.upsert(
            branch,
            BranchUpdate {
                parent: Some(new_parent.to_string()),
                ..Default::default()
            },
        )?;
        info!(%branch, from = %old_parent, to = %new_parent, "re-parented");
        Ok(old_parent)
    }

    /// Dissolves the leaf branch `branch`: its changes are left uncommitted on top of its
    /// parent, which is checked out, and the branch and its metadata are deleted.
    pub fn unbranch(&mut self, branch: &str) -> StResult<()> {
        self.ensure_idle()?;
        let (_, parent) = self.non_trunk(branch)?;
        self.ensure_leaf(branch)?;

        let base = self.branch_base(branch)?;
        let tip = self.vcs.branch_sha(branch)?;
        if self.vcs.current_branch()?.as_deref() != Some(branch) {
            self.vcs.checkout(branch)?;
        }
        self.vcs.soft_reset(&base)?;
        if let Err(e) = self.vcs.checkout_keeping_changes(&parent) {
            warn!(%branch, %tip, "could not carry the changes over; restoring the branch");
            self.vcs.soft_reset(&tip)?;
            return Err(e);
        }

        self.vcs.delete_branch(branch)?;
        self.store.remove(branch)?;
        info!(%branch, %parent, "unbranched");
        Ok(())
    }

    /// Deletes the leaf branch `branch`, its git ref included.
    pub fn delete(&mut self, branch: &str) -> StResult<()> {
        self.ensure_idle()?;
        let (_, parent) = self.non_trunk(branch)?;
        self.ensure_leaf(branch)?;

        if self.vcs.current_branch()?.as_deref() == Some(branch) {
            self.vcs.checkout(&parent)?;
        }
        if self.vcs.branch_exists(branch) {
            self.vcs.delete_branch(branch)?;
        } else {
            debug!(%branch, "ref already gone");
        }
        self.store.remove(branch)?;
        info!(%branch, "deleted");
        Ok(())
    }

    /// Renames the local branch `from` to `to`, keeping its place in the stack.
    pub fn rename_branch(&mut self, from: &str, to: &str) -> StResult<()> {
        self.ensure_idle()?;
        if self.store.is_trunk(from) {
            return Err(StError::precondition("Trunk branches cannot be renamed."));
        }
        if self.vcs.branch_exists(to) || self.store.is_trunk(to) {
            return Err(StError::precondition(format!(
                "A branch named `{to}` already exists."
            )));
        }

        self.vcs.rename_branch(from, to)?;
        if self.store.is_tracked(from) {
            if let Err(e) = self.store.rename(from, to) {
                self.vcs.rename_branch(to, from)?;
                return Err(e);
            }
        }
        info!(%from, %to, "renamed");
        Ok(())
    }

    /// Checks out `branch`.
    pub fn checkout(&self, branch: &str) -> StResult<()> {
        if !self.store.is_tracked(branch) {
            debug!(%branch, "checking out an untracked branch");
        }
        self.vcs.checkout(branch)
    }

    /// Replaces the pull request metadata of `branch`. [None] clears it.
    pub fn metaedit(&mut self, branch: &str, pr: Option<PrInfo>) -> StResult<()> {
        self.ensure_idle()?;
        self.non_trunk(branch)?;
        self.store.upsert(
            branch,
            BranchUpdate {
                pr: Some(pr),
                ..Default::default()
            },
        )
    }

    fn ensure_leaf(&self, branch: &str) -> StResult<()> {
        if self.store.tree().has_children(branch) {
            return Err(StError::precondition(format!(
                "`{branch}` has branches stacked on it. Move or remove them first."
            )));
        }
        Ok(())
    }
}
