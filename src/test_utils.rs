//! Shared test utilities: an in-memory [Vcs] and context builders.

use crate::{
    config::RepoConfig,
    ctx::StContext,
    errors::{StError, StResult},
    git::{CommitOptions, FileChange, RebaseOnto, RebaseOutcome, Vcs},
};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap, HashSet},
};
use tempfile::TempDir;

/// A linear-history, in-memory repository. Every mutating call is recorded, and rebases of
/// selected branches can be made to stop on a conflict.
#[derive(Debug, Default)]
pub(crate) struct FakeVcs {
    parents: RefCell<HashMap<String, Option<String>>>,
    branches: RefCell<BTreeMap<String, String>>,
    head: RefCell<Option<String>>,
    next_id: Cell<usize>,
    conflicting: RefCell<HashSet<String>>,
    in_flight: RefCell<Option<RebaseOnto>>,
    unmerged: Cell<bool>,
    merged: RefCell<HashSet<String>>,
    dirty: RefCell<Vec<FileChange>>,
    mutations: RefCell<Vec<String>>,
}

impl FakeVcs {
    /// Creates a repository with a single commit on `trunk`, checked out.
    pub(crate) fn new(trunk: &str) -> Self {
        let fake = Self::default();
        let root = fake.new_commit(None);
        fake.branches.borrow_mut().insert(trunk.to_string(), root);
        *fake.head.borrow_mut() = Some(trunk.to_string());
        fake
    }

    fn new_commit(&self, parent: Option<String>) -> String {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let sha = format!("c{id}");
        self.parents.borrow_mut().insert(sha.clone(), parent);
        sha
    }

    fn tip(&self, name: &str) -> String {
        self.branches.borrow()[name].clone()
    }

    fn record(&self, call: String) {
        self.mutations.borrow_mut().push(call);
    }

    fn history(&self, sha: &str) -> Vec<String> {
        let parents = self.parents.borrow();
        let mut out = vec![sha.to_string()];
        let mut current = sha.to_string();
        while let Some(Some(parent)) = parents.get(&current) {
            out.push(parent.clone());
            current = parent.clone();
        }
        out
    }

    /// Adds a commit on top of `branch` without going through the recorded interface.
    pub(crate) fn push_commit(&self, branch: &str) -> String {
        let sha = self.new_commit(Some(self.tip(branch)));
        self.branches
            .borrow_mut()
            .insert(branch.to_string(), sha.clone());
        sha
    }

    /// Creates `name` at `from`'s tip with one commit of its own.
    pub(crate) fn branch_off(&self, name: &str, from: &str) -> String {
        let base = self.tip(from);
        self.branches.borrow_mut().insert(name.to_string(), base);
        self.push_commit(name)
    }

    /// Replaces the tip commit of `branch` with a new one, as `git commit --amend` does.
    pub(crate) fn amend(&self, branch: &str) -> String {
        let parent = self.parents.borrow()[&self.tip(branch)].clone();
        let sha = self.new_commit(parent);
        self.branches
            .borrow_mut()
            .insert(branch.to_string(), sha.clone());
        sha
    }

    /// Makes the next rebase of `branch` stop on a conflict.
    pub(crate) fn conflict_on(&self, branch: &str) {
        self.conflicting.borrow_mut().insert(branch.to_string());
    }

    /// Simulates the user resolving and staging every conflict.
    pub(crate) fn resolve_conflicts(&self) {
        self.unmerged.set(false);
    }

    /// Marks `branch` as merged into trunk.
    pub(crate) fn mark_merged(&self, branch: &str) {
        self.merged.borrow_mut().insert(branch.to_string());
    }

    /// Sets the uncommitted changes reported by `status`.
    pub(crate) fn set_dirty(&self, changes: Vec<FileChange>) {
        *self.dirty.borrow_mut() = changes;
    }

    /// Returns the recorded mutating calls and clears the log.
    pub(crate) fn take_mutations(&self) -> Vec<String> {
        std::mem::take(&mut *self.mutations.borrow_mut())
    }

    /// Returns the branch tips.
    pub(crate) fn tips(&self) -> BTreeMap<String, String> {
        self.branches.borrow().clone()
    }

    fn replay(&self, request: &RebaseOnto) -> StResult<()> {
        let range = self.commit_range(&request.upstream, &self.tip(&request.branch))?;
        let mut base = self.tip_or_sha(&request.onto);
        for _ in range {
            base = self.new_commit(Some(base));
        }
        self.branches
            .borrow_mut()
            .insert(request.branch.clone(), base);
        *self.head.borrow_mut() = Some(request.branch.clone());
        Ok(())
    }

    fn tip_or_sha(&self, revision: &str) -> String {
        self.branches
            .borrow()
            .get(revision)
            .cloned()
            .unwrap_or_else(|| revision.to_string())
    }

    fn head_branch(&self) -> StResult<String> {
        self.head
            .borrow()
            .clone()
            .ok_or_else(|| StError::ExitFailed("HEAD is detached".to_string()))
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> StResult<Option<String>> {
        Ok(self.head.borrow().clone())
    }

    fn local_branches(&self) -> StResult<Vec<String>> {
        Ok(self.branches.borrow().keys().cloned().collect())
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.branches.borrow().contains_key(name)
    }

    fn branch_sha(&self, name: &str) -> StResult<String> {
        self.branches
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| StError::ExitFailed(format!("no branch {name}")))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> StResult<bool> {
        let ancestor = self.tip_or_sha(ancestor);
        Ok(self
            .history(&self.tip_or_sha(descendant))
            .contains(&ancestor))
    }

    fn merge_base(&self, a: &str, b: &str) -> StResult<String> {
        let ours = self.history(&self.tip_or_sha(a));
        self.history(&self.tip_or_sha(b))
            .into_iter()
            .find(|sha| ours.contains(sha))
            .ok_or_else(|| StError::ExitFailed("no merge base".to_string()))
    }

    fn commit_range(&self, base: &str, head: &str) -> StResult<Vec<String>> {
        let excluded = self.history(&self.tip_or_sha(base));
        let mut range = self
            .history(&self.tip_or_sha(head))
            .into_iter()
            .take_while(|sha| !excluded.contains(sha))
            .collect::<Vec<_>>();
        range.reverse();
        Ok(range)
    }

    fn commit_message(&self, sha: &str) -> StResult<String> {
        Ok(format!("message of {sha}"))
    }

    fn status(&self) -> StResult<Vec<FileChange>> {
        Ok(self.dirty.borrow().clone())
    }

    fn changed_files(&self, _base: &str, _head: &str) -> StResult<Vec<FileChange>> {
        Ok(Vec::new())
    }

    fn rebase_in_progress(&self) -> StResult<bool> {
        Ok(self.in_flight.borrow().is_some())
    }

    fn has_unmerged_paths(&self) -> StResult<bool> {
        Ok(self.unmerged.get())
    }

    fn remote_url(&self, _remote: &str) -> StResult<Option<String>> {
        Ok(Some("git@github.com:o/r.git".to_string()))
    }

    fn is_merged_into(&self, branch: &str, _trunk: &str) -> StResult<bool> {
        Ok(self.merged.borrow().contains(branch))
    }

    fn checkout(&self, name: &str) -> StResult<()> {
        self.record(format!("checkout {name}"));
        self.branch_sha(name)?;
        *self.head.borrow_mut() = Some(name.to_string());
        Ok(())
    }

    fn checkout_keeping_changes(&self, name: &str) -> StResult<()> {
        self.checkout(name)
    }

    fn create_branch(&self, name: &str, at: &str) -> StResult<()> {
        self.record(format!("create {name}"));
        let sha = self.tip_or_sha(at);
        self.branches.borrow_mut().insert(name.to_string(), sha);
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> StResult<()> {
        self.record(format!("delete {name}"));
        self.branches.borrow_mut().remove(name);
        Ok(())
    }

    fn rename_branch(&self, from: &str, to: &str) -> StResult<()> {
        self.record(format!("rename {from} {to}"));
        let sha = self
            .branches
            .borrow_mut()
            .remove(from)
            .ok_or_else(|| StError::ExitFailed(format!("no branch {from}")))?;
        self.branches.borrow_mut().insert(to.to_string(), sha);
        if self.head.borrow().as_deref() == Some(from) {
            *self.head.borrow_mut() = Some(to.to_string());
        }
        Ok(())
    }

    fn add_all(&self) -> StResult<()> {
        self.record("add-all".to_string());
        Ok(())
    }

    fn commit(&self, opts: &CommitOptions) -> StResult<()> {
        let branch = self.head_branch()?;
        self.record(format!("commit {branch}"));
        if opts.amend {
            self.amend(&branch);
        } else {
            self.push_commit(&branch);
        }
        self.dirty.borrow_mut().clear();
        Ok(())
    }

    fn soft_reset(&self, sha: &str) -> StResult<()> {
        let branch = self.head_branch()?;
        self.record(format!("reset {branch} {sha}"));
        self.branches.borrow_mut().insert(branch, sha.to_string());
        Ok(())
    }

    fn rebase_onto(&self, request: &RebaseOnto) -> StResult<RebaseOutcome> {
        self.record(format!("rebase {}", request.branch));
        if self.in_flight.borrow().is_some() {
            return Err(StError::ExitFailed("a rebase is already in progress".to_string()));
        }
        if self.conflicting.borrow_mut().remove(&request.branch) {
            *self.in_flight.borrow_mut() = Some(request.clone());
            *self.head.borrow_mut() = None;
            self.unmerged.set(true);
            return Ok(RebaseOutcome::Conflict);
        }
        self.replay(request)?;
        Ok(RebaseOutcome::Done)
    }

    fn rebase_continue(&self) -> StResult<RebaseOutcome> {
        self.record("rebase --continue".to_string());
        if self.unmerged.get() {
            return Ok(RebaseOutcome::Conflict);
        }
        let request = self
            .in_flight
            .borrow_mut()
            .take()
            .ok_or_else(|| StError::ExitFailed("no rebase in progress".to_string()))?;
        self.replay(&request)?;
        Ok(RebaseOutcome::Done)
    }

    fn rebase_abort(&self) -> StResult<()> {
        self.record("rebase --abort".to_string());
        let request = self
            .in_flight
            .borrow_mut()
            .take()
            .ok_or_else(|| StError::ExitFailed("no rebase in progress".to_string()))?;
        self.unmerged.set(false);
        *self.head.borrow_mut() = Some(request.branch);
        Ok(())
    }
}

/// Builds a context over `vcs` whose state lives in a fresh temporary directory, with `main` as
/// trunk. The directory must outlive the context.
pub(crate) fn fake_ctx(vcs: FakeVcs) -> (TempDir, StContext<FakeVcs>) {
    let dir = tempfile::tempdir().unwrap();
    let config = RepoConfig::new(dir.path(), vec!["main".to_string()]).unwrap();
    let ctx = StContext::load(vcs, config, dir.path()).unwrap();
    (dir, ctx)
}

/// Reopens the state in `dir` with a new context, as a later process invocation would.
pub(crate) fn reopen(dir: &TempDir, vcs: FakeVcs) -> StContext<FakeVcs> {
    let config = RepoConfig::new(dir.path(), vec!["main".to_string()]).unwrap();
    StContext::load(vcs, config, dir.path()).unwrap()
}

/// Builds `main -> feat1 -> feat2 -> ...` with each branch tracked on the previous one.
pub(crate) fn linear_stack(names: &[&str]) -> (TempDir, StContext<FakeVcs>) {
    let vcs = FakeVcs::new("main");
    let mut parent = "main";
    for name in names {
        vcs.branch_off(name, parent);
        parent = name;
    }
    let (dir, mut ctx) = fake_ctx(vcs);
    let mut parent = "main";
    for name in names {
        ctx.track(name, parent).unwrap();
        parent = name;
    }
    ctx.vcs.take_mutations();
    (dir, ctx)
}
