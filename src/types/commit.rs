//! Commit types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{RepoId, Sha};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commit {
    pub sha: Sha,
    pub message: String,
    pub author: String,
    pub author_email: String,
    pub date: Option<DateTime<Utc>>,
    pub html_url: String,
    pub additions: u64,
    pub deletions: u64,
    pub repository: String,
    pub branch: Option<String>,
}

impl Commit {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Default number of commits returned by a listing.
pub const DEFAULT_COMMIT_LIMIT: usize = 30;

/// Filter for commit listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFilter {
    /// Without a repository, every non-archived repository is scanned.
    pub repository: Option<RepoId>,
    /// Branch or SHA to list from; the default branch when unset.
    pub branch: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for CommitFilter {
    fn default() -> Self {
        Self {
            repository: None,
            branch: None,
            since: None,
            limit: DEFAULT_COMMIT_LIMIT,
        }
    }
}
