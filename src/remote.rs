//! Remote-derived facts about tracked branches: whether a branch matches its remote
//! counterpart, and whether it has already landed on trunk.
//!
//! Remote lookups are the only network calls. They run concurrently with each other and never
//! touch the working tree, so a lookup that fails only leaves that branch's remote state unknown.

use crate::{
    ctx::StContext,
    errors::{StError, StResult},
    git::Vcs,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    path::PathBuf,
    process::Stdio,
    sync::Arc,
};
use tokio::{process::Command, sync::Semaphore};
use tracing::{debug, info, warn};

/// Upper bound on concurrent remote lookups.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Answers "where does this branch point on the remote?".
#[async_trait]
pub trait RemoteRefs: Send + Sync {
    /// Returns the commit `branch` points at on `remote`, or [None] if the remote has no such
    /// branch.
    async fn remote_sha(&self, remote: &str, branch: &str) -> StResult<Option<String>>;
}

/// [RemoteRefs] backed by `git ls-remote`.
#[derive(Debug, Clone)]
pub struct GitRemote {
    workdir: PathBuf,
}

impl GitRemote {
    /// Creates a lookup that runs `git` inside `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

#[async_trait]
impl RemoteRefs for GitRemote {
    async fn remote_sha(&self, remote: &str, branch: &str) -> StResult<Option<String>> {
        let output = Command::new("git")
            .args(["ls-remote", remote, &format!("refs/heads/{branch}")])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(StError::ExitFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|line| line.split_whitespace().next())
            .map(ToOwned::to_owned))
    }
}

/// Remote tips fetched for a set of branches.
///
/// A branch missing from the map was not looked up, or its lookup failed. A branch mapped to
/// [None] has no counterpart on the remote.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct RemoteSync {
    shas: HashMap<String, Option<String>>,
}

impl RemoteSync {
    /// Looks up the remote tip of every branch in `branches` concurrently.
    ///
    /// ## Takes
    /// - `refs` - The lookup to use.
    /// - `remote` - The remote name.
    /// - `branches` - The branches to look up.
    ///
    /// ## Returns
    /// The collected tips. Failed lookups are logged and left out.
    pub async fn populate_remote_shas(
        refs: Arc<dyn RemoteRefs>,
        remote: &str,
        branches: impl IntoIterator<Item = String>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_LOOKUPS));
        let handles = branches
            .into_iter()
            .map(|branch| {
                let refs = Arc::clone(&refs);
                let permits = Arc::clone(&permits);
                let remote = remote.to_string();
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    let sha = refs.remote_sha(&remote, &branch).await;
                    (branch, sha)
                })
            })
            .collect::<Vec<_>>();

        let mut shas = HashMap::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((branch, Ok(sha))) => {
                    debug!(%branch, ?sha, "fetched remote tip");
                    shas.insert(branch, sha);
                }
                Ok((branch, Err(e))) => warn!(%branch, error = %e, "remote lookup failed"),
                Err(e) => warn!(error = %e, "remote lookup task failed"),
            }
        }
        info!(count = shas.len(), "populated remote tips");
        Self { shas }
    }

    /// Returns the fetched remote tip of `branch`. The outer [None] means unknown.
    pub fn remote_sha(&self, branch: &str) -> Option<Option<&str>> {
        self.shas.get(branch).map(Option::as_deref)
    }
}

/// How a tracked branch stands with respect to submitting it for review.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubmitReadiness {
    /// The branch name.
    pub name: String,
    /// Local tip differs from the remote, or the remote state is unknown.
    pub needs_submit: bool,
    /// The branch does not sit on its parent's tip.
    pub needs_restack: bool,
    /// Every change on the branch is already on the primary trunk.
    pub merged: bool,
    /// The pull request number, if one was recorded.
    pub pr_number: Option<u64>,
}

impl<V: Vcs> StContext<V> {
    /// Returns `true` if the local tip of `branch` is the tip fetched from the remote.
    ///
    /// ## Returns
    /// - `Ok(false)` - The tips differ, the remote has no such branch, or its state is unknown.
    /// - `Err(StError::UntrackedBranch)` - `branch` has no metadata. Callers treat this as
    ///   "never needs submit".
    pub fn branch_matches_remote(&self, sync: &RemoteSync, branch: &str) -> StResult<bool> {
        self.store.get(branch)?;
        let local = self.vcs.branch_sha(branch)?;
        Ok(sync.remote_sha(branch).flatten() == Some(local.as_str()))
    }

    /// Returns `true` if `branch` has local changes the remote does not. Untracked branches and
    /// trunks never need submitting.
    pub fn needs_submit(&self, sync: &RemoteSync, branch: &str) -> StResult<bool> {
        if self.store.is_trunk(branch) {
            return Ok(false);
        }
        match self.branch_matches_remote(sync, branch) {
            Ok(matches) => Ok(!matches),
            Err(StError::UntrackedBranch(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if every change on `branch` is already on `trunk`, including when it landed
    /// through a squash or rebase merge.
    pub fn is_merged(&self, branch: &str, trunk: &str) -> StResult<bool> {
        let merged = self.vcs.is_merged_into(branch, trunk)?;
        debug!(%branch, %trunk, merged, "checked merge state");
        Ok(merged)
    }

    /// Reports every tracked branch whose ref still exists, in insertion order.
    pub fn submit_readiness(&self, sync: &RemoteSync) -> StResult<Vec<SubmitReadiness>> {
        let trunk = self.config.trunk().to_string();
        self.store
            .all_names()
            .filter(|name| self.vcs.branch_exists(name))
            .map(|name| -> StResult<SubmitReadiness> {
                let branch = self.store.get(name)?;
                Ok(SubmitReadiness {
                    name: name.to_string(),
                    needs_submit: self.needs_submit(sync, name)?,
                    needs_restack: !self.is_branch_fixed(name)?,
                    merged: self.is_merged(name, &trunk)?,
                    pr_number: branch.pr_info.map(|pr| pr.number),
                })
            })
            .collect()
    }
}
