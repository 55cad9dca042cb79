//! Drift check between each repository's configured branch pair.

use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::{analyze_drift, drift_severity, has_significant_drift, recommended_actions};
use crate::config::ReposConfig;
use crate::github::{GitHubApi, GitHubApiError};
use crate::types::{DriftSeverity, RefComparison, RepoId};

use super::{CommandError, parse_repo};

/// Drift between `base_branch` and `head_branch` of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Carries the classification in `drift`.
    pub comparison: RefComparison,
    pub severity: DriftSeverity,
    pub actions: &'static [&'static str],
}

/// Checks one repository, or every non-archived repository when
/// `repository` is `None`.
///
/// A single-repository check always returns exactly one report. A scan skips
/// repositories whose comparison fails and keeps only reports with file
/// changes.
pub async fn check_drift<A: GitHubApi>(
    api: &A,
    repos: &ReposConfig,
    repository: Option<&str>,
) -> Result<Vec<DriftReport>, CommandError> {
    if let Some(repository) = repository {
        let repo = parse_repo(repository)?;
        let report = check_repo(api, repos, &repo)
            .await
            .map_err(CommandError::api(format!("check drift for {}", repo)))?;
        return Ok(vec![report]);
    }

    let candidates = api
        .list_repositories("", false)
        .await
        .map_err(CommandError::api("list repositories"))?;

    let mut reports = Vec::new();
    for candidate in &candidates {
        let repo = match candidate.repo_id() {
            Ok(repo) => repo,
            Err(e) => {
                warn!(error = %e, "skipping repository with malformed name");
                continue;
            }
        };
        match check_repo(api, repos, &repo).await {
            Ok(report) if has_significant_drift(&report.comparison) => reports.push(report),
            Ok(_) => debug!(repository = %repo, "no drift"),
            Err(e) => warn!(repository = %repo, error = %e, "skipping repository in drift scan"),
        }
    }

    debug!(
        scanned = candidates.len(),
        drifted = reports.len(),
        "drift scan finished"
    );
    Ok(reports)
}

async fn check_repo<A: GitHubApi>(
    api: &A,
    repos: &ReposConfig,
    repo: &RepoId,
) -> Result<DriftReport, GitHubApiError> {
    let branches = repos.branch_config(&repo.full_name());
    let comparison = api
        .compare_refs(repo, &branches.base_branch, &branches.head_branch)
        .await?;

    let status = analyze_drift(&comparison);
    let severity = drift_severity(&comparison);
    Ok(DriftReport {
        comparison: comparison.with_drift(status),
        severity,
        actions: recommended_actions(status),
    })
}
