//! Restacking: bringing branches back in sync with their parents, one at a time, with
//! resumable conflicts.

use super::StContext;
use crate::{
    continuation::{ContinuationFrame, OpKind},
    errors::{StError, StResult},
    git::{RebaseOnto, RebaseOutcome, Vcs},
    scope::{self, Scope},
    store::BranchUpdate,
};
use tracing::{debug, info};

impl<V: Vcs> StContext<V> {
    /// Restacks every branch in `scope` relative to `branch`.
    ///
    /// ## Returns
    /// - `Ok(Vec<String>)` - The branches that were rebased, in order. Fixed branches are skipped.
    /// - `Err(StError::BlockedDuringRebase)` - Another restack is paused.
    /// - `Err(StError::RebaseConflict)` - A rebase stopped on a conflict; the rest of the queue
    ///   was persisted and can be resumed with [StContext::continue_restack].
    pub fn restack(&mut self, branch: &str, scope: Scope) -> StResult<Vec<String>> {
        self.restack_as(OpKind::Restack, branch, scope)
    }

    /// Restacks `scope` relative to `branch` on behalf of `op_kind`, which is recorded in the
    /// frame if a conflict pauses the queue.
    pub fn restack_as(
        &mut self,
        op_kind: OpKind,
        branch: &str,
        scope: Scope,
    ) -> StResult<Vec<String>> {
        self.ensure_idle()?;
        let queue = scope::resolve(&self.store, branch, scope)?;
        let source = self
            .vcs
            .current_branch()?
            .unwrap_or_else(|| branch.to_string());
        info!(op = %op_kind, %branch, %scope, ?queue, "restacking");
        self.run_queue(op_kind, &source, queue)
    }

    /// Restacks the descendants of `branch` after its tip moved. Untracked branches have none.
    pub fn restack_descendants(&mut self, op_kind: OpKind, branch: &str) -> StResult<Vec<String>> {
        if !self.store.is_tracked(branch) {
            self.ensure_idle()?;
            return Ok(Vec::new());
        }
        self.restack_as(op_kind, branch, Scope::UpstackExclusive)
    }

    /// Resumes the paused restack once conflicts are resolved.
    ///
    /// The interrupted branch's recorded parent commit is only moved if its history now sits on
    /// the parent's tip. Branches finished before the conflict are never visited again.
    pub fn continue_restack(&mut self) -> StResult<Vec<String>> {
        let frame = self
            .continuations
            .load()?
            .ok_or_else(|| StError::precondition("No paused `stk` operation to continue."))?;
        if self.vcs.has_unmerged_paths()? {
            return Err(StError::precondition(
                "There are still unresolved conflicts. Resolve them and stage them with `git add` first.",
            ));
        }

        if self.vcs.rebase_in_progress()? && self.vcs.rebase_continue()? == RebaseOutcome::Conflict {
            debug!("rebase stopped on another conflict");
            return Err(StError::RebaseConflict(frame));
        }

        let mut restacked = Vec::new();
        if let Some(current) = frame.current_branch() {
            if self.finalize(current)? {
                restacked.push(current.to_string());
            }
        }
        self.continuations.clear()?;
        info!(op = %frame.op_kind, remaining = ?frame.remaining_branches, "continuing");

        restacked.extend(self.run_queue(
            frame.op_kind,
            &frame.source_branch_name,
            frame.remaining_branches,
        )?);
        self.return_to(&frame.source_branch_name)?;
        Ok(restacked)
    }

    /// Abandons the paused restack: aborts git's rebase, drops the frame and returns to the
    /// branch the operation started from.
    pub fn abort_restack(&mut self) -> StResult<ContinuationFrame> {
        let frame = self
            .continuations
            .load()?
            .ok_or_else(|| StError::precondition("No paused `stk` operation to abort."))?;
        if self.vcs.rebase_in_progress()? {
            self.vcs.rebase_abort()?;
        }
        self.continuations.clear()?;
        self.return_to(&frame.source_branch_name)?;
        info!(op = %frame.op_kind, "aborted");
        Ok(frame)
    }

    /// Records `branch` as restacked if its history contains its parent's tip.
    fn finalize(&mut self, branch: &str) -> StResult<bool> {
        let (_, parent) = self.non_trunk(branch)?;
        let parent_tip = self.vcs.branch_sha(&parent)?;
        let tip = self.vcs.branch_sha(branch)?;
        if !self.vcs.is_ancestor(&parent_tip, &tip)? {
            debug!(%branch, "not on its parent's tip; leaving it for the queue");
            return Ok(false);
        }
        self.store.upsert(
            branch,
            BranchUpdate {
                parent_sha: Some(parent_tip),
                ..Default::default()
            },
        )?;
        Ok(true)
    }

    /// Restacks each branch of `queue` in order. On a conflict, the branch being rebased and
    /// everything after it are persisted as a [ContinuationFrame].
    fn run_queue(
        &mut self,
        op_kind: OpKind,
        source: &str,
        queue: Vec<String>,
    ) -> StResult<Vec<String>> {
        let mut restacked = Vec::new();
        for (i, branch) in queue.iter().enumerate() {
            if self.is_branch_fixed(branch)? {
                debug!(%branch, "already fixed");
                continue;
            }

            let (_, parent) = self.non_trunk(branch)?;
            let onto = self.vcs.branch_sha(&parent)?;
            let request = RebaseOnto {
                branch: branch.clone(),
                upstream: self.branch_base(branch)?,
                onto: onto.clone(),
                interactive: false,
            };

            match self.vcs.rebase_onto(&request)? {
                RebaseOutcome::Done => {
                    self.store.upsert(
                        branch,
                        BranchUpdate {
                            parent_sha: Some(onto),
                            ..Default::default()
                        },
                    )?;
                    info!(%branch, %parent, "restacked");
                    restacked.push(branch.clone());
                }
                RebaseOutcome::Conflict => {
                    let frame = ContinuationFrame {
                        op_kind,
                        source_branch_name: source.to_string(),
                        remaining_branches: queue[i..].to_vec(),
                    };
                    self.continuations.save(&frame)?;
                    return Err(StError::RebaseConflict(frame));
                }
            }
        }

        if !restacked.is_empty() {
            self.return_to(source)?;
        }
        Ok(restacked)
    }

    /// Checks out `branch` if it still exists and is not already checked out.
    fn return_to(&self, branch: &str) -> StResult<()> {
        if !self.vcs.branch_exists(branch)
            || self.vcs.current_branch()?.as_deref() == Some(branch)
        {
            return Ok(());
        }
        self.vcs.checkout(branch)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        continuation::OpKind,
        ctx::StContext,
        errors::StError,
        git::Vcs,
        scope::Scope,
        store::BranchUpdate,
        test_utils::{linear_stack, reopen},
    };

    fn parent_sha(ctx: &StContext<crate::test_utils::FakeVcs>, name: &str) -> String {
        ctx.store.get(name).unwrap().parent_sha.unwrap()
    }

    #[test]
    fn recorded_parent_tip_means_fixed() {
        let (_dir, ctx) = linear_stack(&["feat1", "feat2"]);
        assert!(ctx.is_branch_fixed("main").unwrap());
        assert!(ctx.is_branch_fixed("feat1").unwrap());
        assert!(ctx.is_branch_fixed("feat2").unwrap());
    }

    #[test]
    fn amending_a_parent_stales_only_children() {
        let (_dir, ctx) = linear_stack(&["feat1", "feat2"]);
        ctx.vcs.amend("feat1");
        assert!(ctx.is_branch_fixed("feat1").unwrap());
        assert!(!ctx.is_branch_fixed("feat2").unwrap());
    }

    #[test]
    fn rewriting_a_branch_off_its_parent_stales_it() {
        let (_dir, mut ctx) = linear_stack(&["a", "b"]);
        let main_tip = ctx.vcs.tips()["main"].clone();
        ctx.vcs.checkout("b").unwrap();
        ctx.vcs.soft_reset(&main_tip).unwrap();
        ctx.vcs.push_commit("b");

        assert_eq!(parent_sha(&ctx, "b"), ctx.vcs.tips()["a"]);
        assert!(!ctx.is_branch_fixed("b").unwrap());

        assert_eq!(ctx.restack("b", Scope::Current).unwrap(), vec!["b"]);
        assert!(ctx.is_branch_fixed("b").unwrap());
        let tips = ctx.vcs.tips();
        assert_eq!(ctx.vcs.commit_range(&tips["a"], &tips["b"]).unwrap().len(), 1);
    }

    #[test]
    fn restacking_fixed_scope_is_a_no_op() {
        let (_dir, mut ctx) = linear_stack(&["feat1", "feat2", "feat3"]);
        let before = ["feat1", "feat2", "feat3"].map(|b| parent_sha(&ctx, b));

        let restacked = ctx.restack("main", Scope::Upstack).unwrap();
        assert!(restacked.is_empty());
        assert!(ctx.vcs.take_mutations().is_empty());
        assert_eq!(["feat1", "feat2", "feat3"].map(|b| parent_sha(&ctx, b)), before);
    }

    #[test]
    fn restack_moves_children_onto_new_tips() {
        let (_dir, mut ctx) = linear_stack(&["feat1", "feat2", "feat3"]);
        ctx.vcs.push_commit("main");

        let restacked = ctx.restack("feat1", Scope::Upstack).unwrap();
        assert_eq!(restacked, vec!["feat1", "feat2", "feat3"]);
        for (branch, parent) in [("feat1", "main"), ("feat2", "feat1"), ("feat3", "feat2")] {
            assert!(ctx.is_branch_fixed(branch).unwrap());
            assert_eq!(parent_sha(&ctx, branch), ctx.vcs.tips()[parent]);
        }
        assert_eq!(
            ctx.vcs.take_mutations(),
            vec!["rebase feat1", "rebase feat2", "rebase feat3", "checkout main"]
        );
    }

    #[test]
    fn upstack_exclusive_leaves_the_branch_alone() {
        let (_dir, mut ctx) = linear_stack(&["feat1", "feat2"]);
        ctx.vcs.push_commit("main");
        ctx.vcs.amend("feat1");

        let restacked = ctx.restack("feat1", Scope::UpstackExclusive).unwrap();
        assert_eq!(restacked, vec!["feat2"]);
        assert!(!ctx.is_branch_fixed("feat1").unwrap());
        assert!(ctx.is_branch_fixed("feat2").unwrap());
    }

    #[test]
    fn conflict_pauses_and_resume_finishes_the_rest() {
        let (dir, mut ctx) = linear_stack(&["a", "b", "c"]);
        ctx.vcs.push_commit("main");
        ctx.vcs.conflict_on("b");

        let err = ctx.restack("a", Scope::Upstack).unwrap_err();
        let StError::RebaseConflict(frame) = err else {
            panic!("expected a conflict, got {err:?}");
        };
        assert_eq!(frame.remaining_branches, vec!["b", "c"]);
        assert_eq!(frame.op_kind, OpKind::Restack);
        assert!(ctx.is_branch_fixed("a").unwrap());
        assert!(!ctx.is_branch_fixed("b").unwrap());
        assert_eq!(ctx.vcs.take_mutations(), vec!["rebase a", "rebase b"]);

        // A later invocation resumes from disk.
        let StContext { vcs, .. } = ctx;
        vcs.resolve_conflicts();
        let mut ctx = reopen(&dir, vcs);
        let restacked = ctx.continue_restack().unwrap();
        assert_eq!(restacked, vec!["b", "c"]);
        assert_eq!(
            ctx.vcs.take_mutations(),
            vec!["rebase --continue", "rebase c", "checkout main"]
        );
        for branch in ["a", "b", "c"] {
            assert!(ctx.is_branch_fixed(branch).unwrap());
        }
        assert!(!ctx.continuations.is_pending());
    }

    #[test]
    fn continue_with_unresolved_conflicts_keeps_the_frame() {
        let (_dir, mut ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.push_commit("main");
        ctx.vcs.conflict_on("a");
        assert!(ctx.restack("a", Scope::Upstack).unwrap_err().is_conflict());

        let err = ctx.continue_restack().unwrap_err();
        assert!(matches!(err, StError::PreconditionsFailed(_)));
        assert!(ctx.continuations.is_pending());
        assert!(!ctx.is_branch_fixed("a").unwrap());
    }

    #[test]
    fn second_restack_is_blocked_without_touching_the_store() {
        let (dir, mut ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.push_commit("main");
        ctx.vcs.conflict_on("a");
        assert!(ctx.restack("main", Scope::Upstack).unwrap_err().is_conflict());
        ctx.vcs.take_mutations();
        let store_before = std::fs::read_to_string(crate::store::store_path(dir.path())).unwrap();

        let err = ctx.restack("b", Scope::Current).unwrap_err();
        assert!(matches!(err, StError::BlockedDuringRebase));
        assert!(ctx.vcs.take_mutations().is_empty());
        assert_eq!(
            std::fs::read_to_string(crate::store::store_path(dir.path())).unwrap(),
            store_before
        );
    }

    #[test]
    fn abort_discards_the_frame() {
        let (_dir, mut ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.checkout("b").unwrap();
        ctx.vcs.push_commit("main");
        ctx.vcs.conflict_on("a");
        assert!(ctx.restack("a", Scope::Upstack).unwrap_err().is_conflict());
        ctx.vcs.take_mutations();

        let frame = ctx.abort_restack().unwrap();
        assert_eq!(frame.source_branch_name, "b");
        assert_eq!(ctx.vcs.take_mutations(), vec!["rebase --abort", "checkout b"]);
        assert!(!ctx.continuations.is_pending());
        assert!(!ctx.is_branch_fixed("a").unwrap());

        // Nothing is paused anymore, so a new restack can start.
        assert_eq!(ctx.restack("a", Scope::Upstack).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn continue_without_frame_fails() {
        let (_dir, mut ctx) = linear_stack(&["a"]);
        assert!(matches!(
            ctx.continue_restack(),
            Err(StError::PreconditionsFailed(_))
        ));
        assert!(matches!(ctx.abort_restack(), Err(StError::PreconditionsFailed(_))));
    }

    #[test]
    fn foreign_rebase_blocks_restack() {
        let (_dir, mut ctx) = linear_stack(&["a"]);
        ctx.vcs.push_commit("main");
        ctx.vcs.conflict_on("a");
        // Simulate a rebase the user started by hand.
        let request = crate::git::RebaseOnto {
            branch: "a".to_string(),
            upstream: "main".to_string(),
            onto: "main".to_string(),
            interactive: false,
        };
        crate::git::Vcs::rebase_onto(&ctx.vcs, &request).unwrap();

        assert!(matches!(
            ctx.restack("a", Scope::Current),
            Err(StError::PreconditionsFailed(_))
        ));
    }

    #[test]
    fn reparented_branch_moves_only_its_own_commits() {
        let (_dir, mut ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.branch_off("side", "main");
        ctx.track("side", "main").unwrap();
        let old_parent_sha = parent_sha(&ctx, "b");

        ctx.store
            .upsert(
                "b",
                BranchUpdate {
                    parent: Some("side".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(parent_sha(&ctx, "b"), old_parent_sha);
        assert!(!ctx.is_branch_fixed("b").unwrap());

        ctx.vcs.take_mutations();
        assert_eq!(ctx.restack("b", Scope::Current).unwrap(), vec!["b"]);
        let tips = ctx.vcs.tips();
        assert_eq!(parent_sha(&ctx, "b"), tips["side"]);
        assert_eq!(
            ctx.vcs.commit_range(&tips["side"], &tips["b"]).unwrap().len(),
            1
        );
    }

    #[test]
    fn vanished_recorded_commit_falls_back_to_the_merge_base() {
        use crate::{
            config::RepoConfig,
            git::repo_test::{commit_file, git, scratch_repo},
        };

        let (dir, backend) = scratch_repo();
        git(dir.path(), &["checkout", "-q", "-b", "feat"]);
        commit_file(dir.path(), "feat.txt", "feature\n", "add feature");
        let git_dir = backend.git_dir().to_path_buf();
        let config = RepoConfig::new(&git_dir, vec!["main".to_string()]).unwrap();
        let mut ctx = StContext::load(backend, config, &git_dir).unwrap();
        ctx.track("feat", "main").unwrap();

        ctx.store
            .upsert(
                "feat",
                BranchUpdate {
                    parent_sha: Some("deadbeef".repeat(5)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!ctx.is_branch_fixed("feat").unwrap());
        assert_eq!(
            ctx.branch_base("feat").unwrap(),
            git(dir.path(), &["rev-parse", "main"])
        );
    }
}
