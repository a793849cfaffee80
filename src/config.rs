//! Repository-level configuration for `stk`.

use crate::{
    constants::{DEFAULT_REMOTE, STK_CONFIG_FILE_NAME},
    errors::{StError, StResult},
    store::write_atomic,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Matches `https://host/owner/repo`, `ssh://user@host:port/owner/repo`, `user@host:owner/repo`
/// and bare `host/owner/repo`, each with an optional `.git` suffix.
static REMOTE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[a-z+]+://)?(?:[^@/]+@)?(?P<host>[^/:@]+)(?::\d+/|[:/])(?P<owner>[^/]+)/(?P<name>[^/]+?)(?:\.git)?/?$",
    )
    .expect("remote url pattern is valid")
});

/// The owner and name of the hosted repository.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoIdentity {
    /// The account or organization owning the repository.
    pub owner: String,
    /// The repository name.
    pub name: String,
    /// The host serving the repository.
    pub hostname: String,
}

/// Parses the owner, name and host out of a remote URL.
///
/// ## Returns
/// - `Some(RepoIdentity)` - The URL has a `host/owner/repo` shape.
/// - `None` - The URL could not be understood.
pub fn owner_and_name_from_url(url: &str) -> Option<RepoIdentity> {
    let captures = REMOTE_URL.captures(url.trim())?;
    Some(RepoIdentity {
        owner: captures["owner"].to_string(),
        name: captures["name"].to_string(),
        hostname: captures["host"].to_string(),
    })
}

/// Returns the path to the config file inside the given git directory.
pub fn config_path(git_dir: &Path) -> PathBuf {
    git_dir.join(STK_CONFIG_FILE_NAME)
}

/// Repository configuration. Built once at startup and passed by reference; changes are only
/// persisted by an explicit [RepoConfig::save].
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoConfig {
    #[serde(skip)]
    path: PathBuf,
    /// Trunk branch names. The first one is the primary trunk.
    pub trunks: Vec<String>,
    /// The remote branches are pushed to and compared against.
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Explicit repository identity. Inferred from the remote URL when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<RepoIdentity>,
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

impl RepoConfig {
    /// Creates a fresh, unsaved config for the repository at `git_dir`.
    pub fn new(git_dir: &Path, trunks: Vec<String>) -> StResult<Self> {
        if trunks.is_empty() {
            return Err(StError::precondition("At least one trunk branch is required."));
        }
        Ok(Self {
            path: config_path(git_dir),
            trunks,
            remote: default_remote(),
            identity: None,
        })
    }

    /// Loads the config for the repository at `git_dir`.
    ///
    /// ## Returns
    /// - `Ok(Some(RepoConfig))` - The config.
    /// - `Ok(None)` - The repository has not been initialized with `stk init`.
    pub fn try_load(git_dir: &Path) -> StResult<Option<Self>> {
        let path = config_path(git_dir);
        if !path.exists() {
            return Ok(None);
        }
        let mut config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        if config.trunks.is_empty() {
            return Err(StError::precondition(format!(
                "{} does not name a trunk branch. Run `stk init` again.",
                path.display()
            )));
        }
        config.path = path;
        Ok(Some(config))
    }

    /// Persists the config to disk.
    pub fn save(&self) -> StResult<()> {
        write_atomic(&self.path, &toml::to_string_pretty(self)?)
    }

    /// Returns the primary trunk.
    pub fn trunk(&self) -> &str {
        self.trunks.first().map(String::as_str).unwrap_or_default()
    }

    /// Returns `true` if `name` is one of the configured trunks.
    pub fn is_trunk(&self, name: &str) -> bool {
        self.trunks.iter().any(|t| t == name)
    }

    /// Returns the repository identity, falling back to parsing `remote_url`.
    pub fn identity(&self, remote_url: Option<&str>) -> Option<RepoIdentity> {
        self.identity
            .clone()
            .or_else(|| remote_url.and_then(owner_and_name_from_url))
    }
}

#[cfg(test)]
mod test {
    use super::{owner_and_name_from_url, RepoConfig, RepoIdentity};

    fn identity(owner: &str, name: &str, hostname: &str) -> Option<RepoIdentity> {
        Some(RepoIdentity {
            owner: owner.to_string(),
            name: name.to_string(),
            hostname: hostname.to_string(),
        })
    }

    #[test]
    fn parses_common_remote_forms() {
        let expected = identity("o", "r", "github.com");
        assert_eq!(owner_and_name_from_url("https://github.com/o/r.git"), expected);
        assert_eq!(owner_and_name_from_url("git@github.com:o/r.git"), expected);
        assert_eq!(owner_and_name_from_url("github.com/o/r"), expected);
        assert_eq!(owner_and_name_from_url("ssh://git@github.com/o/r.git"), expected);
        assert_eq!(owner_and_name_from_url("https://github.com/o/r/"), expected);
    }

    #[test]
    fn parses_ports_and_other_hosts() {
        assert_eq!(
            owner_and_name_from_url("ssh://git@git.example.com:2222/team/tool.git"),
            identity("team", "tool", "git.example.com")
        );
        assert_eq!(
            owner_and_name_from_url("https://gitlab.com/group/my.repo.git"),
            identity("group", "my.repo", "gitlab.com")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(owner_and_name_from_url("not a url"), None);
        assert_eq!(owner_and_name_from_url("https://github.com/only-owner"), None);
    }

    #[test]
    fn save_is_explicit() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RepoConfig::try_load(dir.path()).unwrap().is_none());

        let mut config = RepoConfig::new(dir.path(), vec!["main".to_string()]).unwrap();
        config.remote = "upstream".to_string();
        assert!(RepoConfig::try_load(dir.path()).unwrap().is_none());

        config.save().unwrap();
        let loaded = RepoConfig::try_load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.trunk(), "main");
        assert!(loaded.is_trunk("main"));
        assert_eq!(
            loaded.identity(Some("git@github.com:o/r.git")),
            identity("o", "r", "github.com")
        );
    }
}
