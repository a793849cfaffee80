//! The status query.

use super::StContext;
use crate::{
    continuation::ContinuationFrame,
    errors::StResult,
    git::{FileChange, Vcs},
};

/// A snapshot of where the user stands.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StatusReport {
    /// The checked-out branch, [None] on a detached `HEAD` (as during a conflicted rebase).
    pub current_branch: Option<String>,
    /// Whether the checked-out branch is a trunk or tracked branch.
    pub tracked: bool,
    /// The checked-out branch's parent.
    pub parent: Option<String>,
    /// Whether the checked-out branch sits on its parent's tip.
    pub fixed: bool,
    /// The paused stack operation, if any.
    pub paused: Option<ContinuationFrame>,
    /// Whether git is mid-rebase.
    pub rebase_in_progress: bool,
    /// Uncommitted changes.
    pub changes: Vec<FileChange>,
}

impl<V: Vcs> StContext<V> {
    /// Reports the checked-out branch, its place in the stack, any paused operation and the
    /// uncommitted changes.
    pub fn status(&self) -> StResult<StatusReport> {
        let current_branch = self.vcs.current_branch()?;
        let branch = current_branch
            .as_deref()
            .and_then(|name| self.store.get(name).ok());

        Ok(StatusReport {
            tracked: branch.is_some(),
            parent: branch.as_ref().and_then(|b| b.parent_name.clone()),
            fixed: match &branch {
                Some(b) => self.is_branch_fixed(&b.name)?,
                None => false,
            },
            paused: self.continuations.load()?,
            rebase_in_progress: self.vcs.rebase_in_progress()?,
            changes: self.vcs.status()?,
            current_branch,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        git::{ChangeKind, FileChange, Vcs},
        scope::Scope,
        test_utils::linear_stack,
    };

    #[test]
    fn reports_the_checked_out_branch() {
        let (_dir, ctx) = linear_stack(&["a", "b"]);
        ctx.vcs.checkout("b").unwrap();
        ctx.vcs.amend("a");
        let change = FileChange {
            path: "src/lib.rs".to_string(),
            kind: ChangeKind::Modified,
        };
        ctx.vcs.set_dirty(vec![change.clone()]);

        let report = ctx.status().unwrap();
        assert_eq!(report.current_branch.as_deref(), Some("b"));
        assert!(report.tracked);
        assert_eq!(report.parent.as_deref(), Some("a"));
        assert!(!report.fixed);
        assert!(report.paused.is_none());
        assert_eq!(report.changes, vec![change]);
    }

    #[test]
    fn reports_a_paused_restack() {
        let (_dir, mut ctx) = linear_stack(&["a"]);
        ctx.vcs.push_commit("main");
        ctx.vcs.conflict_on("a");
        assert!(ctx.restack("a", Scope::Current).unwrap_err().is_conflict());

        let report = ctx.status().unwrap();
        assert_eq!(report.current_branch, None);
        assert!(!report.tracked);
        assert!(report.rebase_in_progress);
        assert_eq!(report.paused.unwrap().remaining_branches, vec!["a"]);
    }
}
