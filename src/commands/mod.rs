//! Use cases built on [`GitHubApi`](crate::github::GitHubApi).
//!
//! Each command is a generic async function over the capability trait, so the
//! same code runs against the live client, the cached client, or a test fake.
//! Repository identifiers arrive as `owner/name` strings and are validated
//! before any remote call.
//!
//! Commands that change remote state accept `dry_run`. A dry run performs
//! only reads and reports what it would have done, prefixed with
//! [`DRY_RUN_PREFIX`].

mod create_pr;
mod delete_branch;
mod drift;
mod error;
mod merge_pr;
mod rollback;
mod status;
mod sync_pr;

pub use create_pr::{CreatePrOutcome, CreatePrRequest, create_pr};
pub use delete_branch::{DeleteBranchOutcome, DeleteBranchRequest, PROTECTED_BRANCHES, delete_branch};
pub use drift::{DriftReport, check_drift};
pub use error::CommandError;
pub use merge_pr::{MergePrRequest, merge_pr};
pub use rollback::{RollbackRequest, trigger_rollback};
pub use status::{
    CheckCiRequest, RecentCommitsRequest, check_ci, list_prs, list_status, parse_since,
    recent_commits,
};
pub use sync_pr::{SyncPrOutcome, SyncPrRequest, create_sync_pr};

use crate::types::RepoId;

/// Prepended to every dry-run message.
pub const DRY_RUN_PREFIX: &str = "[DRY RUN]";

fn parse_repo(input: &str) -> Result<RepoId, CommandError> {
    Ok(RepoId::parse(input)?)
}
