//! The in-memory context of the `stk` application.

use crate::{
    config::RepoConfig,
    continuation::ContinuationManager,
    errors::{StError, StResult},
    git::Vcs,
    store::{store_path, Branch, BranchStore},
};
use std::path::Path;
use tracing::trace;

mod fmt;
mod mutations;
mod restack;
mod status;

pub use fmt::{DisplayBranch, LogEntry};
pub use status::StatusReport;

/// The in-memory context of the `stk` application: the backend, the repository config, the
/// branch metadata store and the continuation manager.
pub struct StContext<V> {
    /// The version-control backend.
    pub vcs: V,
    /// The repository configuration.
    pub config: RepoConfig,
    /// The branch metadata store.
    pub store: BranchStore,
    /// The paused-operation store.
    pub continuations: ContinuationManager,
}

impl<V: Vcs> StContext<V> {
    /// Assembles a context for the repository whose git directory is `git_dir`.
    pub fn load(vcs: V, config: RepoConfig, git_dir: &Path) -> StResult<Self> {
        let store = BranchStore::load(store_path(git_dir), config.trunks.clone())?;
        Ok(Self {
            vcs,
            config,
            store,
            continuations: ContinuationManager::new(git_dir),
        })
    }

    /// Returns the checked-out branch, failing on a detached `HEAD`.
    pub fn current_branch(&self) -> StResult<String> {
        self.vcs
            .current_branch()?
            .ok_or_else(|| StError::precondition("Not on a branch. Check out a branch first."))
    }

    /// Returns the tracked branch `name`, failing if it is a trunk.
    pub(crate) fn non_trunk(&self, name: &str) -> StResult<(Branch, String)> {
        let branch = self.store.get(name)?;
        match branch.parent_name.clone() {
            Some(parent) if !branch.is_trunk => Ok((branch, parent)),
            _ => Err(StError::precondition(format!(
                "`{name}` is a trunk branch; this operation needs a stacked branch."
            ))),
        }
    }

    /// Returns `true` if `name` is up to date with its parent.
    ///
    /// A branch is fixed iff the parent commit it records is the parent's current tip and the
    /// branch's history is built on that commit. Trunks are always fixed. Nothing is cached; a
    /// parent moving makes its children stale at once.
    pub fn is_branch_fixed(&self, name: &str) -> StResult<bool> {
        let branch = self.store.get(name)?;
        let (Some(parent), Some(parent_sha)) = (branch.parent_name, branch.parent_sha) else {
            return Ok(true);
        };
        let parent_tip = self.vcs.branch_sha(&parent)?;
        trace!(branch = name, %parent_sha, %parent_tip, "checking fixed-ness");
        Ok(parent_sha == parent_tip && self.has_in_history(name, &parent_sha)?)
    }

    /// Returns the commit `name`'s own history starts after: the recorded parent commit while it
    /// is still in the branch's history, else the merge-base with the parent.
    pub(crate) fn branch_base(&self, name: &str) -> StResult<String> {
        let (branch, parent) = self.non_trunk(name)?;
        if let Some(recorded) = branch.parent_sha {
            if self.has_in_history(name, &recorded)? {
                return Ok(recorded);
            }
        }
        self.vcs.merge_base(name, &parent)
    }

    /// Returns `true` if `sha` is reachable from the tip of `name`. A commit the repository no
    /// longer has is in no branch's history.
    fn has_in_history(&self, name: &str, sha: &str) -> StResult<bool> {
        let tip = self.vcs.branch_sha(name)?;
        match self.vcs.is_ancestor(sha, &tip) {
            Err(StError::Git2Error(e)) if e.code() == git2::ErrorCode::NotFound => {
                trace!(branch = name, %sha, "recorded commit is gone");
                Ok(false)
            }
            other => other,
        }
    }

    /// Fails if a stack operation is paused, or if git is mid-rebase without `stk` knowing why.
    pub fn ensure_idle(&self) -> StResult<()> {
        if self.continuations.is_pending() {
            return Err(StError::BlockedDuringRebase);
        }
        if self.vcs.rebase_in_progress()? {
            return Err(StError::precondition(
                "A git rebase is in progress that `stk` did not start. Finish it with `git rebase --continue` or `git rebase --abort` first.",
            ));
        }
        Ok(())
    }

    /// Returns tracked branches whose git ref no longer exists.
    pub fn missing_refs(&self) -> Vec<String> {
        self.store
            .all_names()
            .filter(|name| !self.vcs.branch_exists(name))
            .map(ToOwned::to_owned)
            .collect()
    }
}
