//! Read-only listings: repository health, pull requests, commits, CI runs.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::github::GitHubApi;
use crate::types::{
    Commit, CommitFilter, DEFAULT_COMMIT_LIMIT, DEFAULT_PR_LIMIT, DEFAULT_RUN_LIMIT, PrFilter,
    PrStateFilter, PullRequest, RepositoryStatus, RunConclusion, RunFilter, WorkflowRun,
};

use super::{CommandError, parse_repo};

/// Open pull requests counted per repository in a status listing.
const STATUS_PR_LIMIT: usize = 100;

/// Health summary for every repository matching `filter`.
///
/// Per-repository lookups that fail are logged and count as zero open PRs
/// and passing CI; only the repository listing itself can fail the command.
pub async fn list_status<A: GitHubApi>(
    api: &A,
    filter: &str,
    include_archived: bool,
) -> Result<Vec<RepositoryStatus>, CommandError> {
    let repositories = api
        .list_repositories(filter, include_archived)
        .await
        .map_err(CommandError::api("list repositories"))?;

    let mut statuses = Vec::with_capacity(repositories.len());
    for repository in repositories {
        let (open_prs, failed_ci) = match repository.repo_id() {
            Ok(repo) => {
                let prs = PrFilter {
                    repository: Some(repo.clone()),
                    state: PrStateFilter::Open,
                    limit: STATUS_PR_LIMIT,
                };
                let open_prs = match api.list_pull_requests(&prs).await {
                    Ok(prs) => prs.len(),
                    Err(e) => {
                        debug!(repository = %repo, error = %e, "could not count open PRs");
                        0
                    }
                };

                let runs = RunFilter::new(repo.clone()).with_limit(1);
                let failed_ci = match api.list_workflow_runs(&runs).await {
                    Ok(runs) => runs
                        .first()
                        .is_some_and(|run| run.conclusion == RunConclusion::Failure),
                    Err(e) => {
                        debug!(repository = %repo, error = %e, "could not read latest workflow run");
                        false
                    }
                };
                (open_prs, failed_ci)
            }
            Err(e) => {
                warn!(error = %e, "repository with malformed name reported without lookups");
                (0, false)
            }
        };

        statuses.push(RepositoryStatus {
            last_commit_at: repository.pushed_at,
            repository,
            open_prs,
            failed_ci,
        });
    }
    Ok(statuses)
}

/// Pull requests in one repository, or across all of them. A `limit` of 0
/// selects the default of 30.
pub async fn list_prs<A: GitHubApi>(
    api: &A,
    repository: Option<&str>,
    state: PrStateFilter,
    limit: usize,
) -> Result<Vec<PullRequest>, CommandError> {
    let filter = PrFilter {
        repository: repository.map(parse_repo).transpose()?,
        state,
        limit: if limit == 0 { DEFAULT_PR_LIMIT } else { limit },
    };
    api.list_pull_requests(&filter)
        .await
        .map_err(CommandError::api("list pull requests"))
}

#[derive(Debug, Clone, Default)]
pub struct RecentCommitsRequest {
    /// `owner/name`; every repository when absent.
    pub repository: Option<String>,
    pub branch: Option<String>,
    /// RFC 3339 timestamp or a relative span such as `24h` or `7d`.
    pub since: Option<String>,
    /// 0 selects the default of 30.
    pub limit: usize,
}

/// Recent commits. An unparsable `since` is ignored with a warning.
pub async fn recent_commits<A: GitHubApi>(
    api: &A,
    request: &RecentCommitsRequest,
) -> Result<Vec<Commit>, CommandError> {
    let since = request.since.as_deref().filter(|s| !s.is_empty()).and_then(|raw| {
        let parsed = parse_since(raw, Utc::now());
        if parsed.is_none() {
            warn!(since = raw, "ignoring unparsable since value");
        }
        parsed
    });

    let filter = CommitFilter {
        repository: request.repository.as_deref().map(parse_repo).transpose()?,
        branch: request.branch.clone().filter(|b| !b.is_empty()),
        since,
        limit: if request.limit == 0 {
            DEFAULT_COMMIT_LIMIT
        } else {
            request.limit
        },
    };
    api.list_commits(&filter)
        .await
        .map_err(CommandError::api("list commits"))
}

#[derive(Debug, Clone, Default)]
pub struct CheckCiRequest {
    pub repository: String,
    pub branch: Option<String>,
    /// Workflow file name or numeric ID.
    pub workflow: Option<String>,
    /// 0 selects the default of 10.
    pub limit: usize,
}

/// Recent workflow runs, newest first.
pub async fn check_ci<A: GitHubApi>(
    api: &A,
    request: &CheckCiRequest,
) -> Result<Vec<WorkflowRun>, CommandError> {
    let mut filter = RunFilter::new(parse_repo(&request.repository)?).with_limit(
        if request.limit == 0 {
            DEFAULT_RUN_LIMIT
        } else {
            request.limit
        },
    );
    filter.branch = request.branch.clone().filter(|b| !b.is_empty());
    filter.workflow = request.workflow.clone().filter(|w| !w.is_empty());

    api.list_workflow_runs(&filter)
        .await
        .map_err(CommandError::api("list workflow runs"))
}

/// Parses `input` as an RFC 3339 timestamp, or as a span before `now`.
///
/// Spans are one or more `<integer><unit>` groups with units `s`, `m`, `h`
/// and `d`, e.g. `90s`, `24h`, `1h30m`.
pub fn parse_since(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.with_timezone(&Utc));
    }
    parse_span(input).and_then(|span| now.checked_sub_signed(span))
}

fn parse_span(input: &str) -> Option<Duration> {
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits == 0 {
            return None;
        }
        let amount: i64 = rest[..digits].parse().ok()?;
        let unit = rest[digits..].chars().next()?;
        let part = match unit {
            's' => Duration::try_seconds(amount)?,
            'm' => Duration::try_minutes(amount)?,
            'h' => Duration::try_hours(amount)?,
            'd' => Duration::try_days(amount)?,
            _ => return None,
        };
        total = total.checked_add(&part)?;
        rest = &rest[digits + unit.len_utf8()..];
    }
    Some(total)
}
