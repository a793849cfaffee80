//! Persistence for a paused multi-branch operation.
//!
//! At most one [ContinuationFrame] exists per repository. Its presence on disk is what makes a
//! repository "paused"; there is no other lock.

use crate::{
    constants::STK_CONTINUATION_FILE_NAME,
    errors::{StError, StResult},
    store::temp_sibling,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// The operation that queued the restack held by a [ContinuationFrame].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    /// `stk restack`.
    Restack,
    /// Restack of descendants after a commit or amend.
    Commit,
    /// Restack of descendants after a squash.
    Squash,
    /// Restack after a re-parent.
    SetParent,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Restack => "restack",
            Self::Commit => "commit",
            Self::Squash => "squash",
            Self::SetParent => "set-parent",
        };
        write!(f, "{name}")
    }
}

/// A deferred restack.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContinuationFrame {
    /// The operation that started the restack.
    pub op_kind: OpKind,
    /// The branch that was checked out when the operation started. It is checked out again
    /// once the queue drains or the operation is aborted.
    pub source_branch_name: String,
    /// Branches not yet finished. The first entry is the one stopped mid-rebase.
    pub remaining_branches: Vec<String>,
}

impl ContinuationFrame {
    /// Returns the branch that was being rebased when the frame was written.
    pub fn current_branch(&self) -> Option<&str> {
        self.remaining_branches.first().map(String::as_str)
    }
}

/// Stores the single [ContinuationFrame] of a repository.
#[derive(Debug, Clone)]
pub struct ContinuationManager {
    path: PathBuf,
}

impl ContinuationManager {
    /// Creates a manager storing its frame inside `git_dir`.
    pub fn new(git_dir: &Path) -> Self {
        Self {
            path: git_dir.join(STK_CONTINUATION_FILE_NAME),
        }
    }

    /// Returns `true` if a frame is persisted.
    pub fn is_pending(&self) -> bool {
        self.path.exists()
    }

    /// Persists `frame`.
    ///
    /// The frame is written in full to a temporary file and then hard-linked into place, so the
    /// existence check and the write are one atomic step and a reader never sees a partial frame.
    ///
    /// ## Returns
    /// - `Ok(())` - The frame was persisted.
    /// - `Err(StError::BlockedDuringRebase)` - A frame already exists.
    pub fn save(&self, frame: &ContinuationFrame) -> StResult<()> {
        let tmp = temp_sibling(&self.path);
        let mut file = File::create(&tmp)?;
        file.write_all(toml::to_string_pretty(frame)?.as_bytes())?;
        file.sync_all()?;
        drop(file);

        let linked = fs::hard_link(&tmp, &self.path);
        fs::remove_file(&tmp)?;
        match linked {
            Ok(()) => {
                debug!(?frame, "saved continuation frame");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StError::BlockedDuringRebase),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads the persisted frame, if any.
    pub fn load(&self) -> StResult<Option<ContinuationFrame>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(toml::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the persisted frame. Clearing an absent frame is not an error.
    pub fn clear(&self) -> StResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("cleared continuation frame");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ContinuationFrame, ContinuationManager, OpKind};
    use crate::errors::StError;

    fn frame(remaining: &[&str]) -> ContinuationFrame {
        ContinuationFrame {
            op_kind: OpKind::Restack,
            source_branch_name: "feat3".to_string(),
            remaining_branches: remaining.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ContinuationManager::new(dir.path());
        assert!(manager.load().unwrap().is_none());

        manager.save(&frame(&["b", "c"])).unwrap();
        assert!(manager.is_pending());
        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded.current_branch(), Some("b"));
        assert_eq!(loaded, frame(&["b", "c"]));

        manager.clear().unwrap();
        assert!(!manager.is_pending());
        manager.clear().unwrap();
    }

    #[test]
    fn second_save_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ContinuationManager::new(dir.path());
        manager.save(&frame(&["b"])).unwrap();

        let err = manager.save(&frame(&["x"])).unwrap_err();
        assert!(matches!(err, StError::BlockedDuringRebase));
        assert_eq!(manager.load().unwrap().unwrap(), frame(&["b"]));
    }
}
