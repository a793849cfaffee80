//! Structured, [Serialize] + [Deserialize] representation of the forest of stacked branches.

use serde::{Deserialize, Serialize};

/// A forest of tracked branches, represented as a flat list of records.
///
/// Records are kept in insertion order, which is also the order siblings are visited in. Trunk
/// branches are never stored; a record whose `parent` is not itself a record is a child of a trunk.
///
/// By itself, [StackTree] has no context of its relationship with the local repository. For this
/// functionality, [StContext] holds onto both the store and the backend.
///
/// [StContext]: crate::ctx::StContext
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StackTree {
    /// The tracked branches, in insertion order.
    #[serde(default)]
    pub branches: Vec<TrackedBranch>,
}

impl StackTree {
    /// Gets a branch by name from the stack forest.
    ///
    /// ## Takes
    /// - `branch_name` - The name of the branch to get.
    ///
    /// ## Returns
    /// - `Some(branch)` - The branch.
    /// - `None` - The branch by the name of `branch_name` is not tracked.
    pub fn get(&self, branch_name: &str) -> Option<&TrackedBranch> {
        self.branches.iter().find(|b| b.name == branch_name)
    }

    /// Gets a mutable branch by name from the stack forest.
    pub fn get_mut(&mut self, branch_name: &str) -> Option<&mut TrackedBranch> {
        self.branches.iter_mut().find(|b| b.name == branch_name)
    }

    /// Inserts a branch record. An existing record with the same name is replaced in place, so it
    /// keeps its position among its siblings.
    pub fn insert(&mut self, branch: TrackedBranch) {
        match self.get_mut(&branch.name) {
            Some(existing) => *existing = branch,
            None => self.branches.push(branch),
        }
    }

    /// Removes a branch record from the stack forest. Children of the removed branch are left
    /// pointing at it; callers are responsible for only removing leaves.
    ///
    /// ## Returns
    /// - `Some(branch)` - The removed branch.
    /// - `None` - The branch by the name of `branch_name` was not found.
    pub fn remove(&mut self, branch_name: &str) -> Option<TrackedBranch> {
        let index = self.branches.iter().position(|b| b.name == branch_name)?;
        Some(self.branches.remove(index))
    }

    /// Returns the names of all tracked branches, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|b| b.name.as_str())
    }

    /// Returns the children of `branch_name`, in insertion order.
    pub fn children<'a>(&'a self, branch_name: &'a str) -> impl Iterator<Item = &'a str> {
        self.branches
            .iter()
            .filter(move |b| b.parent == branch_name)
            .map(|b| b.name.as_str())
    }

    /// Returns `true` if `branch_name` has at least one tracked child.
    pub fn has_children(&self, branch_name: &str) -> bool {
        self.children(branch_name).next().is_some()
    }

    /// Returns the chain of parent names above `branch_name`, nearest first. The chain ends with
    /// the first name that has no record, which is the trunk for a well-formed forest.
    ///
    /// The walk stops after visiting every record once, so a corrupted file with a cycle cannot
    /// loop forever.
    pub fn ancestors(&self, branch_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = branch_name;
        while let Some(branch) = self.get(current) {
            if chain.len() > self.branches.len() {
                break;
            }
            chain.push(branch.parent.clone());
            current = branch.parent.as_str();
        }
        chain
    }

    /// Returns the root of the tree `branch_name` belongs to.
    pub fn root_of(&self, branch_name: &str) -> String {
        self.ancestors(branch_name)
            .pop()
            .unwrap_or_else(|| branch_name.to_string())
    }

    /// Returns every descendant of `branch_name` in depth-first, parent-before-child order.
    /// Siblings are visited in insertion order.
    pub fn descendants(&self, branch_name: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.fill_descendants(branch_name, &mut out);
        out
    }

    fn fill_descendants(&self, name: &str, out: &mut Vec<String>) {
        for child in self.children(name) {
            if out.iter().any(|seen| seen == child) {
                continue;
            }
            out.push(child.to_string());
            self.fill_descendants(child, out);
        }
    }

    /// Returns `true` if making `new_parent` the parent of `branch_name` would close a cycle.
    pub fn would_cycle(&self, branch_name: &str, new_parent: &str) -> bool {
        new_parent == branch_name || self.ancestors(new_parent).iter().any(|a| a == branch_name)
    }
}

/// A local branch tracked by `stk`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackedBranch {
    /// The branch name.
    pub name: String,
    /// The parent branch's name.
    pub parent: String,
    /// The commit of the parent this branch was last known to be built on, in string form.
    ///
    /// Only a successful restack or an explicit re-parent moves it.
    pub parent_sha: String,
    /// The pull request metadata for the branch, if it has been submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrInfo>,
}

impl TrackedBranch {
    /// Creates a new [TrackedBranch] with no pull request metadata.
    pub fn new(name: String, parent: String, parent_sha: String) -> Self {
        Self {
            name,
            parent,
            parent_sha,
            pr: None,
        }
    }
}

/// Pull request metadata for a branch that is tracked by `stk`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PrInfo {
    /// The number of the pull request.
    pub number: u64,
    /// Title of the pull request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body of the pull request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whether or not the pull request is a draft.
    #[serde(default)]
    pub is_draft: bool,
    /// The last known review decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_state: Option<ReviewState>,
}

/// Review decision of a pull request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    ReviewRequired,
}
