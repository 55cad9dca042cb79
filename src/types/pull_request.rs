//! Pull request types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{PrNumber, RepoId, Sha};

/// The REST state of a pull request.
///
/// GitHub reports merged PRs as `closed` with `merged_at` set; see
/// [`PullRequest::is_merged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    #[default]
    Open,
    Closed,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "open",
            PrState::Closed => "closed",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request as returned by the list and get endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: PrNumber,
    pub title: String,
    pub body: Option<String>,
    pub state: PrState,
    pub draft: bool,
    pub html_url: String,
    pub author: String,
    pub head_branch: String,
    pub base_branch: String,
    /// `None` while GitHub is still computing mergeability.
    pub mergeable: Option<bool>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub reviewers: Vec<String>,
    /// `owner/name` of the repository the PR belongs to.
    pub repository: String,
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.state == PrState::Open
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Returns true only when GitHub has positively reported conflicts.
    pub fn has_conflicts(&self) -> bool {
        self.mergeable == Some(false)
    }
}

/// Which pull requests a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrStateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl PrStateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStateFilter::Open => "open",
            PrStateFilter::Closed => "closed",
            PrStateFilter::All => "all",
        }
    }
}

impl FromStr for PrStateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "open" => Ok(PrStateFilter::Open),
            "closed" => Ok(PrStateFilter::Closed),
            "all" => Ok(PrStateFilter::All),
            other => Err(format!("invalid pull request state '{other}'")),
        }
    }
}

/// Default number of pull requests returned by a listing.
pub const DEFAULT_PR_LIMIT: usize = 30;

/// Filter for pull request listings.
///
/// Without a repository, every non-archived repository of the user is scanned
/// until `limit` pull requests have been collected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrFilter {
    pub repository: Option<RepoId>,
    pub state: PrStateFilter,
    pub limit: usize,
}

impl Default for PrFilter {
    fn default() -> Self {
        Self {
            repository: None,
            state: PrStateFilter::Open,
            limit: DEFAULT_PR_LIMIT,
        }
    }
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// Branch containing the changes.
    pub head: String,
    /// Branch the changes should be merged into.
    pub base: String,
    pub draft: bool,
}

/// How a pull request is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    /// Returns the GitHub API string for this method.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Error returned for a merge method other than merge, squash or rebase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid merge method '{0}', must be merge, squash, or rebase")]
pub struct InvalidMergeMethod(pub String);

impl FromStr for MergeMethod {
    type Err = InvalidMergeMethod;

    /// An empty string selects the default (`merge`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            other => Err(InvalidMergeMethod(other.to_string())),
        }
    }
}

/// Result of merging a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub merged: bool,
    pub sha: Option<Sha>,
    pub message: String,
    pub pr_url: String,
    pub pr_number: PrNumber,
    pub method: MergeMethod,
    pub branch_name: Option<String>,
    pub branch_deleted: bool,
    /// Set when a follow-up step failed after the merge itself succeeded.
    pub warning: Option<String>,
}
