//! The live GitHub adapter.
//!
//! Every operation runs the same pipeline: wait on the rate budget, then send
//! through the retry loop, feeding each response's rate-limit headers back
//! into the budget and classifying non-2xx statuses, then decode the body
//! into domain types. Listings repeat the pipeline once per page.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::types::{
    Commit, CommitFilter, DEFAULT_COMMIT_LIMIT, DEFAULT_PR_LIMIT, DEFAULT_RUN_LIMIT, MergeMethod,
    MergeOutcome, NewPullRequest, PrFilter, PrNumber, PrStateFilter, PullRequest, RefComparison,
    RepoId, Repository, RunFilter, RunId, Sha, WorkflowRun,
};

use super::api::GitHubApi;
use super::error::GitHubApiError;
use super::models::{
    CommitDto, ComparisonDto, MergeResponseDto, PullRequestDto, RepositoryDto, UserDto,
    WorkflowRunsPage,
};
use super::rate_limit::RateBudget;
use super::retry::{RetryConfig, retry_with_backoff};
use super::transport::{ApiRequest, ApiResponse, Transport};

/// Largest page size the REST API accepts.
pub const MAX_PER_PAGE: usize = 100;

/// GitHub adapter over a [`Transport`].
///
/// Clones share the transport, the rate budget and the cancellation token.
pub struct GitHubClient<T> {
    transport: Arc<T>,
    rate_budget: Arc<RateBudget>,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl<T> Clone for GitHubClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            rate_budget: Arc::clone(&self.rate_budget),
            retry: self.retry,
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> std::fmt::Debug for GitHubClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("rate_budget", &self.rate_budget)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> GitHubClient<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            rate_budget: Arc::new(RateBudget::new(config.rate_limit_threshold)),
            retry: config.retry,
            cancel: CancellationToken::new(),
        }
    }

    /// Aborts rate-limit waits and retry backoffs once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn rate_budget(&self) -> &RateBudget {
        &self.rate_budget
    }

    /// Sends one request through the rate budget and the retry loop.
    ///
    /// Errors carry `operation` and `target`; their classification is left
    /// untouched.
    async fn execute(
        &self,
        operation: &'static str,
        target: &str,
        request: ApiRequest,
    ) -> Result<ApiResponse, GitHubApiError> {
        self.rate_budget
            .wait(&self.cancel)
            .await
            .map_err(|e| e.with_context(operation, target))?;

        let request = &request;
        retry_with_backoff(self.retry, operation, &self.cancel, || async move {
            let response = self.transport.send(request.clone()).await?;
            self.rate_budget.update(response.rate_limit);
            if response.is_success() {
                Ok(response)
            } else {
                Err(GitHubApiError::from_response(response.status, &response.body))
            }
        })
        .await
        .into_result(operation)
        .map_err(|e| e.with_context(operation, target))
    }

    async fn fetch<D: DeserializeOwned>(
        &self,
        operation: &'static str,
        target: &str,
        request: ApiRequest,
    ) -> Result<D, GitHubApiError> {
        let response = self.execute(operation, target, request).await?;
        decode(&response, operation, target)
    }

    /// Follows `Link: rel="next"` until exhausted or until `limit` items have
    /// been collected. `map_page` turns one decoded page into the items to
    /// keep, so filters apply page by page.
    async fn collect_pages<P, I, F>(
        &self,
        operation: &'static str,
        target: &str,
        request: ApiRequest,
        limit: Option<usize>,
        mut map_page: F,
    ) -> Result<Vec<I>, GitHubApiError>
    where
        P: DeserializeOwned,
        F: FnMut(P) -> Vec<I>,
    {
        let per_page = limit.map_or(MAX_PER_PAGE, |l| l.clamp(1, MAX_PER_PAGE));
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_request = request
                .clone()
                .query("per_page", per_page)
                .query("page", page);
            let response = self.execute(operation, target, page_request).await?;
            let next_page = response.next_page;
            let decoded: P = decode(&response, operation, target)?;
            items.extend(map_page(decoded));

            if let Some(limit) = limit {
                if items.len() >= limit {
                    items.truncate(limit);
                    break;
                }
            }

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        debug!(operation, target, count = items.len(), "collected pages");
        Ok(items)
    }

    async fn list_repo_pull_requests(
        &self,
        repo: &RepoId,
        state: PrStateFilter,
        limit: usize,
    ) -> Result<Vec<PullRequest>, GitHubApiError> {
        let request = ApiRequest::get(format!("/repos/{}/pulls", repo))
            .query("state", state.as_str())
            .query("sort", "updated")
            .query("direction", "desc");
        self.collect_pages(
            "list_pull_requests",
            &repo.full_name(),
            request,
            Some(limit),
            |page: Vec<PullRequestDto>| page.into_iter().map(|pr| pr.into_domain(repo)).collect(),
        )
        .await
    }

    async fn list_repo_commits(
        &self,
        repo: &RepoId,
        filter: &CommitFilter,
        limit: usize,
    ) -> Result<Vec<Commit>, GitHubApiError> {
        let mut request = ApiRequest::get(format!("/repos/{}/commits", repo));
        if let Some(branch) = &filter.branch {
            request = request.query("sha", branch);
        }
        if let Some(since) = filter.since {
            request = request.query("since", since.to_rfc3339());
        }

        let branch = filter.branch.as_deref();
        self.collect_pages(
            "list_commits",
            &repo.full_name(),
            request,
            Some(limit),
            |page: Vec<CommitDto>| {
                page.into_iter()
                    .map(|c| c.into_domain(repo, branch))
                    .collect()
            },
        )
        .await
    }

    /// Non-archived repositories as parsed identifiers, for cross-repository
    /// listings. Unparsable names are skipped.
    async fn scan_targets(&self) -> Result<Vec<RepoId>, GitHubApiError> {
        let repos = self.list_repositories("", false).await?;
        Ok(repos
            .iter()
            .filter_map(|r| match r.repo_id() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %e, "skipping repository with malformed name");
                    None
                }
            })
            .collect())
    }
}

fn decode<D: DeserializeOwned>(
    response: &ApiResponse,
    operation: &'static str,
    target: &str,
) -> Result<D, GitHubApiError> {
    serde_json::from_str(&response.body)
        .map_err(|e| GitHubApiError::decode(e).with_context(operation, target))
}

fn limit_or(limit: usize, default: usize) -> usize {
    if limit == 0 { default } else { limit }
}

impl<T: Transport> GitHubApi for GitHubClient<T> {
    async fn list_repositories(
        &self,
        filter: &str,
        include_archived: bool,
    ) -> Result<Vec<Repository>, GitHubApiError> {
        let needle = filter.to_lowercase();
        let request = ApiRequest::get("/user/repos")
            .query("affiliation", "owner,organization_member")
            .query("sort", "updated");

        let repos = self
            .collect_pages("list_repositories", "user", request, None, |page: Vec<RepositoryDto>| {
                page.into_iter()
                    .filter(|r| include_archived || !r.archived)
                    .filter(|r| needle.is_empty() || r.full_name.to_lowercase().contains(&needle))
                    .map(Repository::from)
                    .collect()
            })
            .await?;

        debug!(count = repos.len(), filter, include_archived, "listed repositories");
        Ok(repos)
    }

    async fn get_repository(&self, repo: &RepoId) -> Result<Repository, GitHubApiError> {
        let dto: RepositoryDto = self
            .fetch(
                "get_repository",
                &repo.full_name(),
                ApiRequest::get(format!("/repos/{}", repo)),
            )
            .await?;
        Ok(dto.into())
    }

    async fn list_pull_requests(
        &self,
        filter: &PrFilter,
    ) -> Result<Vec<PullRequest>, GitHubApiError> {
        let limit = limit_or(filter.limit, DEFAULT_PR_LIMIT);

        if let Some(repo) = &filter.repository {
            return self.list_repo_pull_requests(repo, filter.state, limit).await;
        }

        let mut all = Vec::new();
        for repo in self.scan_targets().await? {
            match self
                .list_repo_pull_requests(&repo, filter.state, limit - all.len())
                .await
            {
                Ok(prs) => all.extend(prs),
                Err(e) => {
                    warn!(repository = %repo, error = %e, "skipping repository in pull request scan");
                    continue;
                }
            }
            if all.len() >= limit {
                break;
            }
        }
        all.truncate(limit);
        Ok(all)
    }

    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> Result<PullRequest, GitHubApiError> {
        let dto: PullRequestDto = self
            .fetch(
                "get_pull_request",
                &format!("{}{}", repo, number),
                ApiRequest::get(format!("/repos/{}/pulls/{}", repo, number.0)),
            )
            .await?;
        Ok(dto.into_domain(repo))
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, GitHubApiError> {
        let body = json!({
            "title": pr.title,
            "body": pr.body,
            "head": pr.head,
            "base": pr.base,
            "draft": pr.draft,
        });
        let dto: PullRequestDto = self
            .fetch(
                "create_pull_request",
                &repo.full_name(),
                ApiRequest::post(format!("/repos/{}/pulls", repo), body),
            )
            .await?;
        let created = dto.into_domain(repo);

        info!(
            repository = %repo,
            number = %created.number,
            head = %pr.head,
            base = %pr.base,
            "created pull request"
        );
        Ok(created)
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
        method: MergeMethod,
        commit_title: Option<&str>,
    ) -> Result<MergeOutcome, GitHubApiError> {
        let mut body = json!({ "merge_method": method.as_api_str() });
        if let Some(title) = commit_title.filter(|t| !t.is_empty()) {
            body["commit_title"] = json!(title);
        }

        let dto: MergeResponseDto = self
            .fetch(
                "merge_pull_request",
                &format!("{}{}", repo, number),
                ApiRequest::put(format!("/repos/{}/pulls/{}/merge", repo, number.0), body),
            )
            .await?;

        info!(repository = %repo, number = %number, method = %method, "merged pull request");

        Ok(MergeOutcome {
            merged: dto.merged,
            sha: dto.sha.map(Sha),
            message: dto.message,
            pr_url: format!("https://github.com/{}/pull/{}", repo, number.0),
            pr_number: number,
            method,
            branch_name: None,
            branch_deleted: false,
            warning: None,
        })
    }

    async fn list_commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>, GitHubApiError> {
        let limit = limit_or(filter.limit, DEFAULT_COMMIT_LIMIT);

        if let Some(repo) = &filter.repository {
            return self.list_repo_commits(repo, filter, limit).await;
        }

        let mut all = Vec::new();
        for repo in self.scan_targets().await? {
            match self.list_repo_commits(&repo, filter, limit - all.len()).await {
                Ok(commits) => all.extend(commits),
                Err(e) => {
                    warn!(repository = %repo, error = %e, "skipping repository in commit scan");
                    continue;
                }
            }
            if all.len() >= limit {
                break;
            }
        }
        all.truncate(limit);
        Ok(all)
    }

    async fn list_workflow_runs(
        &self,
        filter: &RunFilter,
    ) -> Result<Vec<WorkflowRun>, GitHubApiError> {
        let repo = &filter.repository;
        let path = match &filter.workflow {
            Some(workflow) => format!(
                "/repos/{}/actions/workflows/{}/runs",
                repo,
                urlencoding::encode(workflow)
            ),
            None => format!("/repos/{}/actions/runs", repo),
        };
        let mut request = ApiRequest::get(path);
        if let Some(branch) = &filter.branch {
            request = request.query("branch", branch);
        }

        self.collect_pages(
            "list_workflow_runs",
            &repo.full_name(),
            request,
            Some(limit_or(filter.limit, DEFAULT_RUN_LIMIT)),
            |page: WorkflowRunsPage| {
                page.workflow_runs
                    .into_iter()
                    .map(|run| run.into_domain(repo))
                    .collect()
            },
        )
        .await
    }

    async fn rerun_workflow(&self, repo: &RepoId, run_id: RunId) -> Result<(), GitHubApiError> {
        let path = format!("/repos/{}/actions/runs/{}/rerun", repo, run_id);
        self.execute(
            "rerun_workflow",
            &repo.full_name(),
            ApiRequest::post(path, json!({})),
        )
        .await?;
        info!(repository = %repo, run_id = %run_id, "re-ran workflow");
        Ok(())
    }

    async fn trigger_workflow(
        &self,
        repo: &RepoId,
        workflow: &str,
        git_ref: &str,
    ) -> Result<(), GitHubApiError> {
        let path = format!(
            "/repos/{}/actions/workflows/{}/dispatches",
            repo,
            urlencoding::encode(workflow)
        );
        self.execute(
            "trigger_workflow",
            &repo.full_name(),
            ApiRequest::post(path, json!({ "ref": git_ref })),
        )
        .await?;
        info!(repository = %repo, workflow, git_ref, "dispatched workflow");
        Ok(())
    }

    async fn compare_refs(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<RefComparison, GitHubApiError> {
        let path = format!(
            "/repos/{}/compare/{}...{}",
            repo,
            urlencoding::encode(base),
            urlencoding::encode(head)
        );
        let dto: ComparisonDto = self
            .fetch("compare_refs", &repo.full_name(), ApiRequest::get(path))
            .await?;
        Ok(dto.into_domain(repo, base, head))
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<(), GitHubApiError> {
        self.execute(
            "delete_branch",
            &format!("{}:{}", repo, branch),
            ApiRequest::delete(format!(
                "/repos/{}/git/refs/heads/{}",
                repo,
                urlencoding::encode(branch)
            )),
        )
        .await?;
        info!(repository = %repo, branch, "deleted branch");
        Ok(())
    }

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> Result<(), GitHubApiError> {
        let body = json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha.as_str(),
        });
        self.execute(
            "create_branch",
            &format!("{}:{}", repo, branch),
            ApiRequest::post(format!("/repos/{}/git/refs", repo), body),
        )
        .await?;
        info!(repository = %repo, branch, sha = %sha.short(), "created branch");
        Ok(())
    }

    async fn current_user(&self) -> Result<String, GitHubApiError> {
        let user: UserDto = self
            .fetch("current_user", "user", ApiRequest::get("/user"))
            .await?;
        Ok(user.login)
    }
}
