//! Shared test fakes, fixtures and arbitrary generators for property-based testing.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use proptest::prelude::*;

use crate::github::{ApiRequest, ApiResponse, GitHubApi, GitHubApiError, RateLimitHeaders, Transport};
use crate::types::{
    Commit, CommitFilter, DEFAULT_COMMIT_LIMIT, DEFAULT_PR_LIMIT, DEFAULT_RUN_LIMIT, FileDelta,
    MergeMethod, MergeOutcome, NewPullRequest, PrFilter, PrNumber, PrState, PrStateFilter,
    PullRequest, RefComparison, RepoId, Repository, RunConclusion, RunFilter, RunId, Sha,
    UpstreamStatus, WorkflowRun,
};

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub fn repository_fixture(full_name: &str) -> Repository {
    let name = full_name.rsplit('/').next().unwrap_or(full_name);
    Repository {
        id: 1,
        name: name.to_string(),
        full_name: full_name.to_string(),
        default_branch: "main".to_string(),
        html_url: format!("https://github.com/{}", full_name),
        ..Default::default()
    }
}

pub fn pull_request_fixture(repo: &RepoId, number: u64, head: &str, base: &str) -> PullRequest {
    PullRequest {
        id: number,
        number: PrNumber(number),
        title: format!("PR {}", number),
        state: PrState::Open,
        html_url: format!("https://github.com/{}/pull/{}", repo, number),
        author: "octocat".to_string(),
        head_branch: head.to_string(),
        base_branch: base.to_string(),
        repository: repo.full_name(),
        ..Default::default()
    }
}

pub fn workflow_run_fixture(repo: &RepoId, id: u64, conclusion: RunConclusion) -> WorkflowRun {
    WorkflowRun {
        id: RunId(id),
        name: "CI".to_string(),
        head_branch: Some("main".to_string()),
        status: "completed".to_string(),
        conclusion,
        html_url: format!("https://github.com/{}/actions/runs/{}", repo, id),
        run_number: id,
        run_attempt: 1,
        repository: repo.full_name(),
        ..Default::default()
    }
}

/// A `main...develop` comparison whose upstream status is consistent with
/// the counts.
pub fn comparison_fixture(
    repo: &RepoId,
    ahead_by: u32,
    behind_by: u32,
    files: &[&str],
) -> RefComparison {
    let status = match (ahead_by > 0, behind_by > 0) {
        (true, true) => UpstreamStatus::Diverged,
        (true, false) => UpstreamStatus::Ahead,
        (false, true) => UpstreamStatus::Behind,
        (false, false) if files.is_empty() => UpstreamStatus::Identical,
        (false, false) => UpstreamStatus::Diverged,
    };
    let mut cmp = RefComparison::new(repo.clone(), "main", "develop", status);
    cmp.ahead_by = ahead_by;
    cmp.behind_by = behind_by;
    cmp.total_commits = ahead_by.saturating_add(behind_by);
    cmp.changed_files = files
        .iter()
        .map(|path| FileDelta::new(*path, "modified"))
        .collect();
    cmp
}

// ─── MockGitHub ───────────────────────────────────────────────────────────────

/// One recorded call on [`MockGitHub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListRepositories {
        filter: String,
        include_archived: bool,
    },
    GetRepository {
        repo: String,
    },
    ListPullRequests(PrFilter),
    GetPullRequest {
        repo: String,
        number: PrNumber,
    },
    CreatePullRequest {
        repo: String,
        pr: NewPullRequest,
    },
    MergePullRequest {
        repo: String,
        number: PrNumber,
        method: MergeMethod,
        commit_title: Option<String>,
    },
    ListCommits(CommitFilter),
    ListWorkflowRuns(RunFilter),
    RerunWorkflow {
        repo: String,
        run_id: RunId,
    },
    TriggerWorkflow {
        repo: String,
        workflow: String,
        git_ref: String,
    },
    CompareRefs {
        repo: String,
        base: String,
        head: String,
    },
    DeleteBranch {
        repo: String,
        branch: String,
    },
    CreateBranch {
        repo: String,
        branch: String,
        sha: Sha,
    },
    CurrentUser,
}

impl MockCall {
    /// The trait method name this call was made through.
    pub fn name(&self) -> &'static str {
        match self {
            MockCall::ListRepositories { .. } => "list_repositories",
            MockCall::GetRepository { .. } => "get_repository",
            MockCall::ListPullRequests(_) => "list_pull_requests",
            MockCall::GetPullRequest { .. } => "get_pull_request",
            MockCall::CreatePullRequest { .. } => "create_pull_request",
            MockCall::MergePullRequest { .. } => "merge_pull_request",
            MockCall::ListCommits(_) => "list_commits",
            MockCall::ListWorkflowRuns(_) => "list_workflow_runs",
            MockCall::RerunWorkflow { .. } => "rerun_workflow",
            MockCall::TriggerWorkflow { .. } => "trigger_workflow",
            MockCall::CompareRefs { .. } => "compare_refs",
            MockCall::DeleteBranch { .. } => "delete_branch",
            MockCall::CreateBranch { .. } => "create_branch",
            MockCall::CurrentUser => "current_user",
        }
    }

    fn is_mutation(&self) -> bool {
        matches!(
            self,
            MockCall::CreatePullRequest { .. }
                | MockCall::MergePullRequest { .. }
                | MockCall::RerunWorkflow { .. }
                | MockCall::TriggerWorkflow { .. }
                | MockCall::DeleteBranch { .. }
                | MockCall::CreateBranch { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    repositories: Vec<Repository>,
    pull_requests: Vec<PullRequest>,
    commits: Vec<Commit>,
    /// Newest first.
    workflow_runs: Vec<WorkflowRun>,
    comparisons: HashMap<String, RefComparison>,
    calls: Vec<MockCall>,
    /// One-shot failures, consumed in order.
    next_failures: HashMap<&'static str, VecDeque<u16>>,
    /// Persistent failures for one repository.
    repo_failures: HashMap<(&'static str, String), u16>,
}

/// In-memory [`GitHubApi`] with call recording and failure injection.
///
/// Calls are recorded before failures are injected, so a failed call still
/// counts.
#[derive(Debug, Default)]
pub struct MockGitHub {
    state: Mutex<MockState>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repository(&self, repo: Repository) {
        self.state.lock().repositories.push(repo);
    }

    pub fn add_pull_request(&self, pr: PullRequest) {
        self.state.lock().pull_requests.push(pr);
    }

    pub fn add_commit(&self, commit: Commit) {
        self.state.lock().commits.push(commit);
    }

    /// Runs must be added newest first.
    pub fn add_workflow_run(&self, run: WorkflowRun) {
        self.state.lock().workflow_runs.push(run);
    }

    /// Served for any `compare_refs` on the comparison's repository.
    pub fn set_comparison(&self, comparison: RefComparison) {
        self.state
            .lock()
            .comparisons
            .insert(comparison.repository.full_name(), comparison);
    }

    /// Fails the next call of `operation` with `status`.
    pub fn fail_next(&self, operation: &'static str, status: u16) {
        self.state
            .lock()
            .next_failures
            .entry(operation)
            .or_default()
            .push_back(status);
    }

    /// Fails every call of `operation` on `repo` with `status`.
    pub fn fail_for_repo(&self, operation: &'static str, repo: &str, status: u16) {
        self.state
            .lock()
            .repo_failures
            .insert((operation, repo.to_string()), status);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_named(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.name() == operation)
            .count()
    }

    pub fn mutations(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.state.lock().pull_requests.clone()
    }

    /// Records `call`, then returns the injected failure for it, if any.
    fn record(&self, call: MockCall, repo: Option<&str>) -> Result<(), GitHubApiError> {
        let operation = call.name();
        let mut state = self.state.lock();
        state.calls.push(call);

        let one_shot = state
            .next_failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        let persistent =
            repo.and_then(|r| state.repo_failures.get(&(operation, r.to_string())).copied());
        let status = one_shot.or(persistent);

        match status {
            Some(status) => Err(GitHubApiError::from_response(
                status,
                r#"{"message": "injected failure"}"#,
            )
            .with_context(operation, repo.unwrap_or("user"))),
            None => Ok(()),
        }
    }
}

fn not_found(operation: &'static str, target: impl Into<String>) -> GitHubApiError {
    GitHubApiError::from_response(404, r#"{"message": "Not Found"}"#).with_context(operation, target)
}

fn limit_or(limit: usize, default: usize) -> usize {
    if limit == 0 { default } else { limit }
}

impl GitHubApi for MockGitHub {
    async fn list_repositories(
        &self,
        filter: &str,
        include_archived: bool,
    ) -> Result<Vec<Repository>, GitHubApiError> {
        self.record(
            MockCall::ListRepositories {
                filter: filter.to_string(),
                include_archived,
            },
            None,
        )?;
        let needle = filter.to_lowercase();
        Ok(self
            .state
            .lock()
            .repositories
            .iter()
            .filter(|r| include_archived || !r.archived)
            .filter(|r| needle.is_empty() || r.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_repository(&self, repo: &RepoId) -> Result<Repository, GitHubApiError> {
        let name = repo.full_name();
        self.record(MockCall::GetRepository { repo: name.clone() }, Some(&name))?;
        self.state
            .lock()
            .repositories
            .iter()
            .find(|r| r.full_name == name)
            .cloned()
            .ok_or_else(|| not_found("get_repository", name))
    }

    async fn list_pull_requests(
        &self,
        filter: &PrFilter,
    ) -> Result<Vec<PullRequest>, GitHubApiError> {
        let repo = filter.repository.as_ref().map(RepoId::full_name);
        self.record(MockCall::ListPullRequests(filter.clone()), repo.as_deref())?;
        Ok(self
            .state
            .lock()
            .pull_requests
            .iter()
            .filter(|pr| repo.as_ref().is_none_or(|r| &pr.repository == r))
            .filter(|pr| match filter.state {
                PrStateFilter::Open => pr.is_open(),
                PrStateFilter::Closed => !pr.is_open(),
                PrStateFilter::All => true,
            })
            .take(limit_or(filter.limit, DEFAULT_PR_LIMIT))
            .cloned()
            .collect())
    }

    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> Result<PullRequest, GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::GetPullRequest {
                repo: name.clone(),
                number,
            },
            Some(&name),
        )?;
        self.state
            .lock()
            .pull_requests
            .iter()
            .find(|pr| pr.repository == name && pr.number == number)
            .cloned()
            .ok_or_else(|| not_found("get_pull_request", format!("{}{}", name, number)))
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::CreatePullRequest {
                repo: name.clone(),
                pr: pr.clone(),
            },
            Some(&name),
        )?;

        let mut state = self.state.lock();
        let number = state
            .pull_requests
            .iter()
            .map(|p| p.number.0)
            .max()
            .unwrap_or(0)
            + 1;
        let mut created = pull_request_fixture(repo, number, &pr.head, &pr.base);
        created.title = pr.title.clone();
        created.body = Some(pr.body.clone()).filter(|b| !b.is_empty());
        created.draft = pr.draft;
        state.pull_requests.push(created.clone());
        Ok(created)
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
        method: MergeMethod,
        commit_title: Option<&str>,
    ) -> Result<MergeOutcome, GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::MergePullRequest {
                repo: name.clone(),
                number,
                method,
                commit_title: commit_title.map(str::to_string),
            },
            Some(&name),
        )?;

        let mut state = self.state.lock();
        let pr = state
            .pull_requests
            .iter_mut()
            .find(|pr| pr.repository == name && pr.number == number)
            .ok_or_else(|| not_found("merge_pull_request", format!("{}{}", name, number)))?;
        pr.state = PrState::Closed;
        pr.merged_at = Some(chrono::Utc::now());

        Ok(MergeOutcome {
            merged: true,
            sha: Some(Sha::new("0123456789abcdef0123456789abcdef01234567")),
            message: "Pull Request successfully merged".to_string(),
            pr_url: format!("https://github.com/{}/pull/{}", name, number.0),
            pr_number: number,
            method,
            branch_name: None,
            branch_deleted: false,
            warning: None,
        })
    }

    async fn list_commits(&self, filter: &CommitFilter) -> Result<Vec<Commit>, GitHubApiError> {
        let repo = filter.repository.as_ref().map(RepoId::full_name);
        self.record(MockCall::ListCommits(filter.clone()), repo.as_deref())?;
        Ok(self
            .state
            .lock()
            .commits
            .iter()
            .filter(|c| repo.as_ref().is_none_or(|r| &c.repository == r))
            .filter(|c| match (filter.since, c.date) {
                (Some(since), Some(date)) => date >= since,
                _ => true,
            })
            .take(limit_or(filter.limit, DEFAULT_COMMIT_LIMIT))
            .cloned()
            .collect())
    }

    async fn list_workflow_runs(
        &self,
        filter: &RunFilter,
    ) -> Result<Vec<WorkflowRun>, GitHubApiError> {
        let repo = filter.repository.full_name();
        self.record(MockCall::ListWorkflowRuns(filter.clone()), Some(&repo))?;
        Ok(self
            .state
            .lock()
            .workflow_runs
            .iter()
            .filter(|run| run.repository == repo)
            .filter(|run| {
                filter
                    .branch
                    .as_ref()
                    .is_none_or(|b| run.head_branch.as_ref() == Some(b))
            })
            .take(limit_or(filter.limit, DEFAULT_RUN_LIMIT))
            .cloned()
            .collect())
    }

    async fn rerun_workflow(&self, repo: &RepoId, run_id: RunId) -> Result<(), GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::RerunWorkflow {
                repo: name.clone(),
                run_id,
            },
            Some(&name),
        )
    }

    async fn trigger_workflow(
        &self,
        repo: &RepoId,
        workflow: &str,
        git_ref: &str,
    ) -> Result<(), GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::TriggerWorkflow {
                repo: name.clone(),
                workflow: workflow.to_string(),
                git_ref: git_ref.to_string(),
            },
            Some(&name),
        )
    }

    async fn compare_refs(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<RefComparison, GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::CompareRefs {
                repo: name.clone(),
                base: base.to_string(),
                head: head.to_string(),
            },
            Some(&name),
        )?;
        let mut comparison = self
            .state
            .lock()
            .comparisons
            .get(&name)
            .cloned()
            .ok_or_else(|| not_found("compare_refs", name.clone()))?;
        comparison.base_ref = base.to_string();
        comparison.head_ref = head.to_string();
        Ok(comparison)
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<(), GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::DeleteBranch {
                repo: name.clone(),
                branch: branch.to_string(),
            },
            Some(&name),
        )
    }

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> Result<(), GitHubApiError> {
        let name = repo.full_name();
        self.record(
            MockCall::CreateBranch {
                repo: name.clone(),
                branch: branch.to_string(),
                sha: sha.clone(),
            },
            Some(&name),
        )
    }

    async fn current_user(&self) -> Result<String, GitHubApiError> {
        self.record(MockCall::CurrentUser, None)?;
        Ok("octocat".to_string())
    }
}

// ─── ScriptedTransport ────────────────────────────────────────────────────────

/// A [`Transport`] that replays queued results in order and records every
/// request. An exhausted script answers with a permanent error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, GitHubApiError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: ApiResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: GitHubApiError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GitHubApiError> {
        let path = request.path.clone();
        self.requests.lock().push(request);
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(GitHubApiError::permanent_without_source(format!(
                "no scripted response for {}",
                path
            )))
        })
    }
}

pub fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
    ApiResponse {
        status,
        rate_limit: RateLimitHeaders::default(),
        next_page: None,
        body: body.to_string(),
    }
}

impl ApiResponse {
    pub fn with_next_page(mut self, page: u32) -> Self {
        self.next_page = Some(page);
        self
    }

    pub fn with_rate_limit(mut self, remaining: u32, reset_epoch: i64) -> Self {
        self.rate_limit = RateLimitHeaders {
            remaining: Some(remaining),
            reset_epoch: Some(reset_epoch),
        };
        self
    }
}

// ─── Generators ───────────────────────────────────────────────────────────────

pub fn arb_repo_id() -> impl Strategy<Value = RepoId> {
    ("[a-z][a-z0-9-]{0,15}", "[a-z][a-z0-9._-]{0,20}").prop_map(|(o, r)| RepoId::new(o, r))
}

pub fn arb_branch_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9/-]{0,30}".prop_map(String::from)
}

pub fn arb_file_delta() -> impl Strategy<Value = FileDelta> {
    (
        "[a-z]{1,8}(/[a-z]{1,8}){0,3}\\.[a-z]{1,3}",
        prop_oneof![Just("added"), Just("modified"), Just("removed")],
    )
        .prop_map(|(path, kind)| FileDelta::new(path, kind))
}

/// Comparisons whose upstream status agrees with the counts.
pub fn arb_comparison() -> impl Strategy<Value = RefComparison> {
    (
        arb_repo_id(),
        0u32..50,
        0u32..50,
        prop::collection::vec(arb_file_delta(), 0..5),
    )
        .prop_map(|(repo, ahead, behind, files)| {
            let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
            let mut cmp = comparison_fixture(&repo, ahead, behind, &paths);
            cmp.changed_files = files;
            cmp
        })
}
