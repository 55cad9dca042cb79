//! The capability trait every GitHub access path implements.
//!
//! [`GitHubClient`](super::GitHubClient) talks to the REST API;
//! [`CachedGitHubClient`](super::CachedGitHubClient) wraps any implementation
//! and serves repository and pull request listings from a TTL cache. The
//! use-case layer is generic over this trait, which is also what the test
//! fakes implement.

use std::future::Future;

use crate::types::{
    Commit, CommitFilter, MergeMethod, MergeOutcome, NewPullRequest, PrFilter, PrNumber,
    PullRequest, RefComparison, RepoId, Repository, RunFilter, RunId, Sha, WorkflowRun,
};

use super::error::GitHubApiError;

/// Typed GitHub operations.
///
/// Listing operations follow pagination transparently. Every other operation
/// is a single request.
pub trait GitHubApi: Send + Sync {
    /// Repositories the authenticated user owns or is an org member of, most
    /// recently updated first.
    ///
    /// `filter` is a case-insensitive substring match on `owner/name`; an
    /// empty filter matches everything. Archived repositories are skipped
    /// unless `include_archived` is set.
    fn list_repositories(
        &self,
        filter: &str,
        include_archived: bool,
    ) -> impl Future<Output = Result<Vec<Repository>, GitHubApiError>> + Send;

    fn get_repository(
        &self,
        repo: &RepoId,
    ) -> impl Future<Output = Result<Repository, GitHubApiError>> + Send;

    /// Pull requests for one repository, or across every non-archived
    /// repository when the filter names none.
    fn list_pull_requests(
        &self,
        filter: &PrFilter,
    ) -> impl Future<Output = Result<Vec<PullRequest>, GitHubApiError>> + Send;

    fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> impl Future<Output = Result<PullRequest, GitHubApiError>> + Send;

    fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> impl Future<Output = Result<PullRequest, GitHubApiError>> + Send;

    fn merge_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
        method: MergeMethod,
        commit_title: Option<&str>,
    ) -> impl Future<Output = Result<MergeOutcome, GitHubApiError>> + Send;

    fn list_commits(
        &self,
        filter: &CommitFilter,
    ) -> impl Future<Output = Result<Vec<Commit>, GitHubApiError>> + Send;

    /// Workflow runs, newest first.
    fn list_workflow_runs(
        &self,
        filter: &RunFilter,
    ) -> impl Future<Output = Result<Vec<WorkflowRun>, GitHubApiError>> + Send;

    fn rerun_workflow(
        &self,
        repo: &RepoId,
        run_id: RunId,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;

    /// Dispatches `workflow` (file name or numeric ID) on `git_ref`.
    fn trigger_workflow(
        &self,
        repo: &RepoId,
        workflow: &str,
        git_ref: &str,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;

    /// Compares `base...head`. Always live.
    fn compare_refs(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> impl Future<Output = Result<RefComparison, GitHubApiError>> + Send;

    fn delete_branch(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;

    fn create_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;

    /// Login of the authenticated user.
    fn current_user(&self) -> impl Future<Output = Result<String, GitHubApiError>> + Send;
}
