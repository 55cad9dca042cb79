//! Opening a PR that brings the base branch's changes into the head branch.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::info;

use crate::analysis::has_significant_drift;
use crate::config::{BranchConfig, ReposConfig};
use crate::github::GitHubApi;
use crate::types::{NewPullRequest, PrNumber, RefComparison};

use super::{CommandError, DRY_RUN_PREFIX, parse_repo};

/// Commit summaries listed in a generated PR body.
const MAX_LISTED_COMMITS: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct SyncPrRequest {
    pub repository: String,
    /// Defaults to `sync: merge {base} into {head}`.
    pub title: Option<String>,
    /// Defaults to a summary of the comparison.
    pub body: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPrOutcome {
    pub success: bool,
    pub message: String,
    pub pr_url: Option<String>,
    pub pr_number: Option<PrNumber>,
    pub files_changed: usize,
    pub commits: u32,
}

/// Opens `base_branch -> head_branch` when the two carry different content.
///
/// Branches that differ only by merge commits are reported as in sync and no
/// PR is created.
pub async fn create_sync_pr<A: GitHubApi>(
    api: &A,
    repos: &ReposConfig,
    request: &SyncPrRequest,
) -> Result<SyncPrOutcome, CommandError> {
    let repo = parse_repo(&request.repository)?;
    let branches = repos.branch_config(&request.repository);

    let comparison = api
        .compare_refs(&repo, &branches.base_branch, &branches.head_branch)
        .await
        .map_err(CommandError::api("compare branches"))?;

    let files_changed = comparison.changed_files.len();
    let commits = comparison.total_commits;

    if !has_significant_drift(&comparison) {
        return Ok(SyncPrOutcome {
            success: true,
            message: "Branches are already in sync, no PR needed".to_string(),
            pr_url: None,
            pr_number: None,
            files_changed,
            commits,
        });
    }

    if request.dry_run {
        return Ok(SyncPrOutcome {
            success: true,
            message: format!(
                "{} Would create PR: {} -> {}",
                DRY_RUN_PREFIX, branches.base_branch, branches.head_branch
            ),
            pr_url: None,
            pr_number: None,
            files_changed,
            commits,
        });
    }

    let new_pr = NewPullRequest {
        title: request
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_title(branches)),
        body: request
            .body
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| default_body(branches, &comparison)),
        head: branches.base_branch.clone(),
        base: branches.head_branch.clone(),
        draft: false,
    };

    let pr = api
        .create_pull_request(&repo, &new_pr)
        .await
        .map_err(CommandError::api("create PR"))?;

    info!(repository = %repo, number = %pr.number, commits, files_changed, "opened sync PR");

    Ok(SyncPrOutcome {
        success: true,
        message: format!("Created sync PR {}", pr.number),
        pr_url: Some(pr.html_url),
        pr_number: Some(pr.number),
        files_changed,
        commits,
    })
}

fn default_title(branches: &BranchConfig) -> String {
    format!(
        "sync: merge {} into {}",
        branches.base_branch, branches.head_branch
    )
}

fn default_body(branches: &BranchConfig, comparison: &RefComparison) -> String {
    let mut body = format!(
        "## Sync PR\n\nThis PR syncs `{}` into `{}`.\n\n### Changes\n- **Commits**: {}\n- **Files changed**: {}\n",
        branches.base_branch,
        branches.head_branch,
        comparison.total_commits,
        comparison.changed_files.len(),
    );

    if !comparison.commits.is_empty() {
        body.push_str("\n### Commits\n");
        for commit in comparison.commits.iter().take(MAX_LISTED_COMMITS) {
            let _ = writeln!(body, "- {} {}", commit.sha.short(), commit.summary());
        }
        let hidden = comparison.commits.len().saturating_sub(MAX_LISTED_COMMITS);
        if hidden > 0 {
            let _ = writeln!(body, "- ...and {} more", hidden);
        }
    }

    body.push_str("\n---\n_Created by repo-monitor_");
    body
}
