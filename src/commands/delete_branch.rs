//! Deleting a branch, refusing the protected ones.

use serde::Serialize;

use crate::github::GitHubApi;

use super::{CommandError, DRY_RUN_PREFIX, parse_repo};

/// Branches that are never deleted, whatever the repository.
pub const PROTECTED_BRANCHES: [&str; 4] = ["main", "master", "develop", "production"];

#[derive(Debug, Clone, Default)]
pub struct DeleteBranchRequest {
    pub repository: String,
    pub branch: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteBranchOutcome {
    pub success: bool,
    pub message: String,
}

pub async fn delete_branch<A: GitHubApi>(
    api: &A,
    request: &DeleteBranchRequest,
) -> Result<DeleteBranchOutcome, CommandError> {
    let repo = parse_repo(&request.repository)?;
    let branch = request.branch.as_str();
    if branch.is_empty() {
        return Err(CommandError::MissingField("branch name"));
    }
    if PROTECTED_BRANCHES.contains(&branch) {
        return Err(CommandError::ProtectedBranch(branch.to_string()));
    }

    if request.dry_run {
        return Ok(DeleteBranchOutcome {
            success: true,
            message: format!(
                "{} Would delete branch '{}' from {}",
                DRY_RUN_PREFIX, branch, repo
            ),
        });
    }

    api.delete_branch(&repo, branch)
        .await
        .map_err(CommandError::api(format!("delete branch '{}'", branch)))?;

    Ok(DeleteBranchOutcome {
        success: true,
        message: format!("Deleted branch '{}' from {}", branch, repo),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockGitHub, arb_branch_name};
    use proptest::prelude::*;

    fn request(branch: &str, dry_run: bool) -> DeleteBranchRequest {
        DeleteBranchRequest {
            repository: "octo/app".into(),
            branch: branch.into(),
            dry_run,
        }
    }

    #[tokio::test]
    async fn deletes_feature_branch() {
        let api = MockGitHub::new();
        let outcome = delete_branch(&api, &request("feature/login", false))
            .await
            .unwrap();
        assert_eq!(outcome.message, "Deleted branch 'feature/login' from octo/app");
        assert_eq!(api.calls_named("delete_branch"), 1);
    }

    #[tokio::test]
    async fn protected_branches_are_refused() {
        let api = MockGitHub::new();
        for branch in PROTECTED_BRANCHES {
            let err = delete_branch(&api, &request(branch, false)).await.unwrap_err();
            assert!(matches!(err, CommandError::ProtectedBranch(ref b) if b == branch));
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_branch_is_refused() {
        let api = MockGitHub::new();
        let err = delete_branch(&api, &request("", false)).await.unwrap_err();
        assert_eq!(err.to_string(), "branch name is required");
    }

    #[tokio::test]
    async fn dry_run_makes_no_calls() {
        let api = MockGitHub::new();
        let outcome = delete_branch(&api, &request("stale", true)).await.unwrap();
        assert_eq!(
            outcome.message,
            "[DRY RUN] Would delete branch 'stale' from octo/app"
        );
        assert!(api.calls().is_empty());
    }

    proptest! {
        #[test]
        fn dry_run_never_mutates(branch in arb_branch_name()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let api = MockGitHub::new();
            let _ = rt.block_on(delete_branch(&api, &request(&branch, true)));
            prop_assert!(api.mutations().is_empty());
        }
    }
}
