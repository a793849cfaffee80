//! Selection of branch subsets relative to a branch.

use crate::{
    errors::{StError, StResult},
    store::BranchStore,
};
use clap::ValueEnum;
use std::fmt::Display;

/// A named subset of the stack relative to a branch.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum Scope {
    /// The branch alone.
    Current,
    /// The branch and all of its descendants.
    #[default]
    Upstack,
    /// The descendants of the branch, without the branch itself.
    UpstackExclusive,
    /// The branch and all of its ancestors, trunk included.
    Downstack,
    /// Every branch in the tree rooted at the branch's trunk.
    Fullstack,
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Current => "current",
            Self::Upstack => "upstack",
            Self::UpstackExclusive => "upstack-exclusive",
            Self::Downstack => "downstack",
            Self::Fullstack => "fullstack",
        };
        write!(f, "{name}")
    }
}

/// Computes the ordered branch list for `scope` relative to `branch`.
///
/// Parents always come before their children, so the result can be restacked front to back.
/// Siblings are visited in the order they were tracked.
///
/// ## Returns
/// - `Ok(Vec<String>)` - The branch names, parents first.
/// - `Err(StError::PreconditionsFailed)` - `branch` is not tracked.
pub fn resolve(store: &BranchStore, branch: &str, scope: Scope) -> StResult<Vec<String>> {
    if !store.is_tracked(branch) {
        return Err(StError::precondition(format!(
            "Branch `{branch}` is not tracked with `stk`, so it has no {scope} scope."
        )));
    }
    let tree = store.tree();

    let branches = match scope {
        Scope::Current => vec![branch.to_string()],
        Scope::Upstack => std::iter::once(branch.to_string())
            .chain(tree.descendants(branch))
            .collect(),
        Scope::UpstackExclusive => tree.descendants(branch),
        Scope::Downstack => {
            let mut chain = tree.ancestors(branch);
            chain.reverse();
            chain.push(branch.to_string());
            chain
        }
        Scope::Fullstack => {
            let root = tree.root_of(branch);
            std::iter::once(root.clone())
                .chain(tree.descendants(&root))
                .collect()
        }
    };
    Ok(branches)
}
