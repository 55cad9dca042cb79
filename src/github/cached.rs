//! Caching decorator for [`GitHubApi`].
//!
//! Repository and pull request listings are served from a TTL cache keyed on
//! the operation name and its filter. Every other operation is forwarded to
//! the inner implementation unchanged: comparisons and mutations must see
//! live state.

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheConfig, TtlCache};
use crate::types::{
    Commit, CommitFilter, MergeMethod, MergeOutcome, NewPullRequest, PrFilter, PrNumber,
    PullRequest, RefComparison, RepoId, Repository, RunFilter, RunId, Sha, WorkflowRun,
};

use super::api::GitHubApi;
use super::error::GitHubApiError;

/// Builds `"<operation>:<JSON of params>"`.
///
/// Returns `None` if the parameters cannot be serialized; callers then skip
/// the cache instead of sharing a key.
pub fn cache_key(operation: &str, params: &impl Serialize) -> Option<String> {
    serde_json::to_string(params)
        .ok()
        .map(|json| format!("{}:{}", operation, json))
}

/// A [`GitHubApi`] that caches listings of `A`.
#[derive(Debug)]
pub struct CachedGitHubClient<A> {
    inner: A,
    repositories: TtlCache<Vec<Repository>>,
    pull_requests: TtlCache<Vec<PullRequest>>,
}

impl<A: GitHubApi> CachedGitHubClient<A> {
    pub fn new(inner: A, config: CacheConfig) -> Self {
        Self {
            inner,
            repositories: TtlCache::new(config),
            pull_requests: TtlCache::new(config),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Drops every cached listing.
    pub fn invalidate(&self) {
        self.repositories.clear();
        self.pull_requests.clear();
    }
}

impl<A: GitHubApi> GitHubApi for CachedGitHubClient<A> {
    async fn list_repositories(
        &self,
        filter: &str,
        include_archived: bool,
    ) -> Result<Vec<Repository>, GitHubApiError> {
        let key = cache_key("list_repositories", &(filter, include_archived));
        if let Some(hit) = key.as_deref().and_then(|k| self.repositories.get(k)) {
            debug!(filter, include_archived, "repository listing served from cache");
            return Ok(hit);
        }

        let repos = self.inner.list_repositories(filter, include_archived).await?;
        if let Some(key) = key {
            self.repositories.set(key, repos.clone());
        }
        Ok(repos)
    }

    async fn get_repository(&self, repo: &RepoId) -> Result<Repository, GitHubApiError> {
        self.inner.get_repository(repo).await
    }

    async fn list_pull_requests(
        &self,
        filter: &PrFilter,
    ) -> Result<Vec<PullRequest>, GitHubApiError> {
        let key = cache_key("list_pull_requests", filter);
        if let Some(hit) = key.as_deref().and_then(|k| self.pull_requests.get(k)) {
            debug!(?filter, "pull request listing served from cache");
            return Ok(hit);
        }

        let prs = self.inner.list_pull_requests(filter).await?;
        if let Some(key) = key {
            self.pull_requests.set(key, prs.clone());
        }
        Ok(prs)
    }

    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> Result<PullRequest, GitHubApiError> {
        self.inner.get_pull_request(repo, number).await
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, GitHubApiError> {
        self.inner.create_pull_request(repo, pr).await
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
        method: MergeMethod,
        commit_title: Option<&str>,
    ) -> Result<MergeOutcome, GitHubApiError> {
        self.inner
            .merge_pull_request(repo, number, method, commit_title)
            .await
    }

    async fn list_commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>, GitHubApiError> {
        self.inner.list_commits(filter).await
    }

    async fn list_workflow_runs(
        &self,
        filter: &RunFilter,
    ) -> Result<Vec<WorkflowRun>, GitHubApiError> {
        self.inner.list_workflow_runs(filter).await
    }

    async fn rerun_workflow(&self, repo: &RepoId, run_id: RunId) -> Result<(), GitHubApiError> {
        self.inner.rerun_workflow(repo, run_id).await
    }

    async fn trigger_workflow(
        &self,
        repo: &RepoId,
        workflow: &str,
        git_ref: &str,
    ) -> Result<(), GitHubApiError> {
        self.inner.trigger_workflow(repo, workflow, git_ref).await
    }

    async fn compare_refs(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<RefComparison, GitHubApiError> {
        self.inner.compare_refs(repo, base, head).await
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<(), GitHubApiError> {
        self.inner.delete_branch(repo, branch).await
    }

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> Result<(), GitHubApiError> {
        self.inner.create_branch(repo, branch, sha).await
    }

    async fn current_user(&self) -> Result<String, GitHubApiError> {
        self.inner.current_user().await
    }
}
