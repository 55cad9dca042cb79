//! Merging a pull request, optionally deleting its head branch afterwards.

use tracing::{info, warn};

use crate::github::GitHubApi;
use crate::types::{MergeMethod, MergeOutcome, PrNumber};

use super::{CommandError, DRY_RUN_PREFIX, parse_repo};

#[derive(Debug, Clone, Default)]
pub struct MergePrRequest {
    pub repository: String,
    pub pr_number: u64,
    /// `merge`, `squash` or `rebase`. Empty selects `merge`.
    pub method: String,
    pub commit_title: Option<String>,
    /// Delete the head branch once the merge succeeds.
    pub delete_branch: bool,
    pub dry_run: bool,
}

/// Merges an open, conflict-free pull request.
///
/// Branch deletion runs only after a successful merge, and its failure does
/// not fail the command: the outcome reports the merge with `warning` set.
pub async fn merge_pr<A: GitHubApi>(
    api: &A,
    request: &MergePrRequest,
) -> Result<MergeOutcome, CommandError> {
    let repo = parse_repo(&request.repository)?;
    if request.pr_number == 0 {
        return Err(CommandError::MissingField("pr_number"));
    }
    let number = PrNumber(request.pr_number);
    let method: MergeMethod = request.method.parse()?;

    let pr = api
        .get_pull_request(&repo, number)
        .await
        .map_err(CommandError::api(format!("get PR {}", number)))?;

    if !pr.is_open() {
        return Err(CommandError::PullRequestNotOpen {
            number,
            state: pr.state,
        });
    }
    if pr.has_conflicts() {
        return Err(CommandError::MergeConflicts(number));
    }

    if request.dry_run {
        let mut message = format!(
            "{} Would merge PR {} using {} method",
            DRY_RUN_PREFIX, number, method
        );
        if request.delete_branch {
            message.push_str(&format!(" and delete branch '{}'", pr.head_branch));
        }
        return Ok(MergeOutcome {
            merged: false,
            sha: None,
            message,
            pr_url: pr.html_url,
            pr_number: number,
            method,
            branch_name: Some(pr.head_branch),
            branch_deleted: false,
            warning: None,
        });
    }

    let mut outcome = api
        .merge_pull_request(&repo, number, method, request.commit_title.as_deref())
        .await
        .map_err(CommandError::api(format!("merge PR {}", number)))?;
    outcome.branch_name = Some(pr.head_branch.clone());

    if request.delete_branch && outcome.merged && !pr.head_branch.is_empty() {
        match api.delete_branch(&repo, &pr.head_branch).await {
            Ok(()) => outcome.branch_deleted = true,
            Err(e) => {
                warn!(repository = %repo, branch = %pr.head_branch, error = %e, "merged but could not delete branch");
                outcome.warning = Some(format!(
                    "failed to delete branch '{}': {}",
                    pr.head_branch, e
                ));
            }
        }
    }

    info!(
        repository = %repo,
        number = %number,
        merged = outcome.merged,
        branch_deleted = outcome.branch_deleted,
        "merge finished"
    );
    Ok(outcome)
}
