//! REST payload shapes and their mapping into domain types.
//!
//! Only the fields the crate reads are declared. Fields GitHub omits on some
//! endpoints (PR size stats on list responses, `files` on large compares) are
//! defaulted.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{
    Commit, FileDelta, PrNumber, PrState, PullRequest, RefComparison, RepoId, Repository,
    RunConclusion, RunId, Sha, UpstreamStatus, WorkflowRun,
};

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryDto {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub default_branch: String,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub clone_url: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl From<RepositoryDto> for Repository {
    fn from(r: RepositoryDto) -> Self {
        Repository {
            id: r.id,
            name: r.name,
            full_name: r.full_name,
            description: r.description,
            private: r.private,
            archived: r.archived,
            fork: r.fork,
            default_branch: r.default_branch,
            language: r.language,
            stars: r.stargazers_count,
            forks: r.forks_count,
            open_issues: r.open_issues_count,
            html_url: r.html_url,
            clone_url: r.clone_url,
            updated_at: r.updated_at,
            pushed_at: r.pushed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BranchRefDto {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestDto {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub html_url: String,
    pub user: Option<UserDto>,
    pub head: BranchRefDto,
    pub base: BranchRefDto,
    #[serde(default)]
    pub mergeable: Option<bool>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
    #[serde(default)]
    pub requested_reviewers: Vec<UserDto>,
}

impl PullRequestDto {
    pub fn into_domain(self, repo: &RepoId) -> PullRequest {
        PullRequest {
            id: self.id,
            number: PrNumber(self.number),
            title: self.title,
            body: self.body,
            state: if self.state == "open" {
                PrState::Open
            } else {
                PrState::Closed
            },
            draft: self.draft.unwrap_or(false),
            html_url: self.html_url,
            author: self.user.map(|u| u.login).unwrap_or_default(),
            head_branch: self.head.ref_name,
            base_branch: self.base.ref_name,
            mergeable: self.mergeable,
            additions: self.additions,
            deletions: self.deletions,
            changed_files: self.changed_files,
            created_at: self.created_at,
            updated_at: self.updated_at,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            reviewers: self
                .requested_reviewers
                .into_iter()
                .map(|u| u.login)
                .collect(),
            repository: repo.full_name(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitAuthorDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetailDto {
    #[serde(default)]
    pub message: String,
    pub author: Option<GitAuthorDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitStatsDto {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

#[derive(Debug, Deserialize)]
pub struct CommitDto {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: CommitDetailDto,
    pub stats: Option<CommitStatsDto>,
}

impl CommitDto {
    pub fn into_domain(self, repo: &RepoId, branch: Option<&str>) -> Commit {
        let author = self.commit.author;
        let stats = self.stats.unwrap_or_default();
        Commit {
            sha: Sha(self.sha),
            message: self.commit.message,
            author: author.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
            author_email: author.as_ref().map(|a| a.email.clone()).unwrap_or_default(),
            date: author.and_then(|a| a.date),
            html_url: self.html_url,
            additions: stats.additions,
            deletions: stats.deletions,
            repository: repo.full_name(),
            branch: branch.map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRunDto {
    pub id: u64,
    pub name: Option<String>,
    #[serde(default)]
    pub workflow_id: u64,
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub run_number: u64,
    #[serde(default)]
    pub run_attempt: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub actor: Option<UserDto>,
    #[serde(default)]
    pub event: String,
}

impl WorkflowRunDto {
    pub fn into_domain(self, repo: &RepoId) -> WorkflowRun {
        WorkflowRun {
            id: RunId(self.id),
            name: self.name.unwrap_or_default(),
            workflow_id: self.workflow_id,
            head_branch: self.head_branch,
            head_sha: self.head_sha,
            status: self.status.unwrap_or_default(),
            conclusion: RunConclusion::from_api(self.conclusion.as_deref()),
            html_url: self.html_url,
            run_number: self.run_number,
            run_attempt: self.run_attempt.unwrap_or(1),
            created_at: self.created_at,
            updated_at: self.updated_at,
            repository: repo.full_name(),
            actor: self.actor.map(|a| a.login),
            event: self.event,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRunsPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRunDto>,
}

#[derive(Debug, Deserialize)]
pub struct FileDto {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    pub patch: Option<String>,
}

impl From<FileDto> for FileDelta {
    fn from(f: FileDto) -> Self {
        FileDelta {
            path: f.filename,
            change_kind: f.status,
            additions: f.additions,
            deletions: f.deletions,
            changes: f.changes,
            patch: f.patch,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ComparisonDto {
    pub status: String,
    #[serde(default)]
    pub ahead_by: u32,
    #[serde(default)]
    pub behind_by: u32,
    #[serde(default)]
    pub total_commits: u32,
    #[serde(default)]
    pub commits: Vec<CommitDto>,
    #[serde(default)]
    pub files: Vec<FileDto>,
}

impl ComparisonDto {
    pub fn into_domain(self, repo: &RepoId, base: &str, head: &str) -> RefComparison {
        let mut comparison =
            RefComparison::new(repo.clone(), base, head, UpstreamStatus::from_api(&self.status));
        comparison.ahead_by = self.ahead_by;
        comparison.behind_by = self.behind_by;
        comparison.total_commits = self.total_commits;
        comparison.commits = self
            .commits
            .into_iter()
            .map(|c| c.into_domain(repo, Some(head)))
            .collect();
        comparison.changed_files = self.files.into_iter().map(FileDelta::from).collect();
        comparison
    }
}

#[derive(Debug, Deserialize)]
pub struct MergeResponseDto {
    pub sha: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub message: String,
}
