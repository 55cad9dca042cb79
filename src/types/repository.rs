//! Repository types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{InvalidRepoId, RepoId};

/// A repository visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub archived: bool,
    pub fork: bool,
    pub default_branch: String,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub html_url: String,
    pub clone_url: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// Splits `full_name` into an owner/name pair.
    pub fn repo_id(&self) -> Result<RepoId, InvalidRepoId> {
        RepoId::parse(&self.full_name)
    }
}

/// Summary of a repository's health, as reported by the status command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    pub repository: Repository,
    pub open_prs: usize,
    /// Whether the most recent workflow run concluded with a failure.
    pub failed_ci: bool,
    pub last_commit_at: Option<DateTime<Utc>>,
}
