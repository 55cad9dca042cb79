//! Opening a pull request between two branches.

use serde::Serialize;

use crate::github::GitHubApi;
use crate::types::{NewPullRequest, PullRequest};

use super::{CommandError, DRY_RUN_PREFIX, parse_repo};

#[derive(Debug, Clone, Default)]
pub struct CreatePrRequest {
    pub repository: String,
    pub title: String,
    /// Branch with the changes.
    pub head: String,
    /// Branch to merge into.
    pub base: String,
    pub body: String,
    pub draft: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePrOutcome {
    pub success: bool,
    pub message: String,
    /// `None` for a dry run.
    pub pull_request: Option<PullRequest>,
    pub files_changed: usize,
    pub commits: u32,
}

/// Opens a pull request. A dry run compares `base...head` instead and
/// reports the size of the change.
pub async fn create_pr<A: GitHubApi>(
    api: &A,
    request: &CreatePrRequest,
) -> Result<CreatePrOutcome, CommandError> {
    let repo = parse_repo(&request.repository)?;
    if request.title.is_empty() {
        return Err(CommandError::MissingField("title"));
    }
    if request.head.is_empty() {
        return Err(CommandError::MissingField("head branch"));
    }
    if request.base.is_empty() {
        return Err(CommandError::MissingField("base branch"));
    }

    if request.dry_run {
        let comparison = api
            .compare_refs(&repo, &request.base, &request.head)
            .await
            .map_err(CommandError::api("compare branches"))?;
        let draft = if request.draft { " (draft)" } else { "" };
        return Ok(CreatePrOutcome {
            success: true,
            message: format!(
                "{} Would create PR{}: {} -> {}",
                DRY_RUN_PREFIX, draft, request.head, request.base
            ),
            pull_request: None,
            files_changed: comparison.changed_files.len(),
            commits: comparison.total_commits,
        });
    }

    let new_pr = NewPullRequest {
        title: request.title.clone(),
        body: request.body.clone(),
        head: request.head.clone(),
        base: request.base.clone(),
        draft: request.draft,
    };
    let pr = api
        .create_pull_request(&repo, &new_pr)
        .await
        .map_err(CommandError::api("create PR"))?;

    Ok(CreatePrOutcome {
        success: true,
        message: format!("Created PR {}", pr.number),
        files_changed: usize::try_from(pr.changed_files).unwrap_or(usize::MAX),
        commits: 0,
        pull_request: Some(pr),
    })
}
