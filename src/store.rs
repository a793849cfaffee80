//! The durable branch metadata store.

use crate::{
    constants::STK_STORE_FILE_NAME,
    errors::{StError, StResult},
    tree::{PrInfo, StackTree, TrackedBranch},
};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Returns the path to the branch metadata store inside the given git directory.
pub fn store_path(git_dir: &Path) -> PathBuf {
    git_dir.join(STK_STORE_FILE_NAME)
}

/// Writes `contents` to `path` through a sibling temporary file and a rename, so readers only
/// ever observe the previous or the new contents.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> StResult<()> {
    let tmp = temp_sibling(path);
    let mut file = File::create(&tmp)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Returns the temporary path used while writing `path`.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A read view of one branch, trunk included.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Branch {
    /// The branch name.
    pub name: String,
    /// The parent branch name. [None] iff the branch is a trunk.
    pub parent_name: Option<String>,
    /// The recorded parent commit. [None] iff the branch is a trunk.
    pub parent_sha: Option<String>,
    /// Pull request metadata.
    pub pr_info: Option<PrInfo>,
    /// Whether the branch is one of the configured trunks.
    pub is_trunk: bool,
}

/// A partial update for [BranchStore::upsert]. Fields left as [None] are not touched.
#[derive(Debug, Default, Clone)]
pub struct BranchUpdate {
    /// New parent name. Required when creating a record.
    pub parent: Option<String>,
    /// New recorded parent commit. Required when creating a record.
    pub parent_sha: Option<String>,
    /// New pull request metadata. `Some(None)` clears it.
    pub pr: Option<Option<PrInfo>>,
}

/// Durable CRUD over tracked branch records. Every mutation is flushed before it returns.
#[derive(Debug)]
pub struct BranchStore {
    path: PathBuf,
    trunks: Vec<String>,
    tree: StackTree,
}

impl BranchStore {
    /// Loads the store at `path`, or an empty one if the file does not exist yet.
    ///
    /// ## Takes
    /// - `path` - The location of the store file.
    /// - `trunks` - The configured trunk branch names.
    pub fn load(path: PathBuf, trunks: Vec<String>) -> StResult<Self> {
        let tree = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            StackTree::default()
        };
        Ok(Self { path, trunks, tree })
    }

    /// Returns the underlying forest.
    pub fn tree(&self) -> &StackTree {
        &self.tree
    }

    /// Returns the configured trunks.
    pub fn trunks(&self) -> &[String] {
        &self.trunks
    }

    /// Returns `true` if `name` is a configured trunk.
    pub fn is_trunk(&self, name: &str) -> bool {
        self.trunks.iter().any(|t| t == name)
    }

    /// Returns `true` if `name` is a trunk or has a record.
    pub fn is_tracked(&self, name: &str) -> bool {
        self.is_trunk(name) || self.tree.get(name).is_some()
    }

    /// Gets the branch called `name`.
    ///
    /// ## Returns
    /// - `Ok(Branch)` - The branch.
    /// - `Err(StError::UntrackedBranch)` - No metadata exists for `name`.
    pub fn get(&self, name: &str) -> StResult<Branch> {
        if self.is_trunk(name) {
            return Ok(Branch {
                name: name.to_string(),
                parent_name: None,
                parent_sha: None,
                pr_info: None,
                is_trunk: true,
            });
        }
        let record = self
            .tree
            .get(name)
            .ok_or_else(|| StError::UntrackedBranch(name.to_string()))?;
        Ok(Branch {
            name: record.name.clone(),
            parent_name: Some(record.parent.clone()),
            parent_sha: Some(record.parent_sha.clone()),
            pr_info: record.pr.clone(),
            is_trunk: false,
        })
    }

    /// Applies a partial update to `name`, creating the record if needed.
    ///
    /// The update is validated against the current forest before anything is written: the parent
    /// must be tracked and the new edge must not close a cycle.
    pub fn upsert(&mut self, name: &str, update: BranchUpdate) -> StResult<()> {
        if self.is_trunk(name) {
            return Err(StError::precondition(format!(
                "`{name}` is a trunk branch and cannot have a parent."
            )));
        }

        let mut record = match self.tree.get(name) {
            Some(existing) => existing.clone(),
            None => {
                let (Some(parent), Some(parent_sha)) =
                    (update.parent.clone(), update.parent_sha.clone())
                else {
                    return Err(StError::precondition(format!(
                        "Cannot track `{name}` without a parent and a parent commit."
                    )));
                };
                TrackedBranch::new(name.to_string(), parent, parent_sha)
            }
        };

        if let Some(parent) = update.parent {
            if !self.is_tracked(&parent) {
                return Err(StError::UntrackedBranch(parent));
            }
            if self.tree.would_cycle(name, &parent) {
                return Err(StError::precondition(format!(
                    "Cannot make `{parent}` the parent of `{name}`: `{parent}` is `{name}` or one of its descendants."
                )));
            }
            record.parent = parent;
        }
        if let Some(parent_sha) = update.parent_sha {
            record.parent_sha = parent_sha;
        }
        if let Some(pr) = update.pr {
            record.pr = pr;
        }

        debug!(branch = name, parent = %record.parent, parent_sha = %record.parent_sha, "upserting branch");
        let mut next = self.tree.clone();
        next.insert(record);
        self.commit(next)
    }

    /// Removes the record for `name` and returns it.
    pub fn remove(&mut self, name: &str) -> StResult<TrackedBranch> {
        let mut next = self.tree.clone();
        let removed = next
            .remove(name)
            .ok_or_else(|| StError::UntrackedBranch(name.to_string()))?;
        debug!(branch = name, "removed branch metadata");
        self.commit(next)?;
        Ok(removed)
    }

    /// Renames the record `from` to `to`, re-pointing its children at the new name.
    pub fn rename(&mut self, from: &str, to: &str) -> StResult<()> {
        if self.is_tracked(to) {
            return Err(StError::precondition(format!("`{to}` is already tracked.")));
        }
        let mut next = self.tree.clone();
        next.get_mut(from)
            .ok_or_else(|| StError::UntrackedBranch(from.to_string()))?
            .name = to.to_string();
        next.branches
            .iter_mut()
            .filter(|b| b.parent == from)
            .for_each(|b| b.parent = to.to_string());
        self.commit(next)
    }

    /// Returns every tracked branch name (trunks excluded), in insertion order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.tree.names()
    }

    /// Persists `next` to disk, then makes it the in-memory forest. A failed write leaves both
    /// untouched.
    fn commit(&mut self, next: StackTree) -> StResult<()> {
        write_atomic(&self.path, &toml::to_string_pretty(&next)?)?;
        self.tree = next;
        Ok(())
    }
}
