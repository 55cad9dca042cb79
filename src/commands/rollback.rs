//! Rolling back a bad deployment.

use tracing::{debug, info};

use crate::analysis::determine_strategy;
use crate::github::GitHubApi;
use crate::types::{RepoId, RollbackOutcome, RollbackStrategy, RunFilter, RunId, WorkflowRun};

use super::{CommandError, DRY_RUN_PREFIX, parse_repo};

const REVERT_MESSAGE: &str = "Revert strategy requires manual intervention - create a revert commit through the GitHub UI or CLI";

#[derive(Debug, Clone, Default)]
pub struct RollbackRequest {
    pub repository: String,
    /// `rerun`, `revert` or `workflow`. Chosen from the latest workflow run
    /// when absent.
    pub strategy: Option<String>,
    /// Workflow to dispatch for the `workflow` strategy.
    pub workflow_id: Option<u64>,
    /// Run to re-run; the newest run when absent.
    pub run_id: Option<RunId>,
    pub dry_run: bool,
}

/// Rolls back a bad deployment.
///
/// `revert` is never automated; it returns an unsuccessful outcome telling
/// the caller to revert by hand.
pub async fn trigger_rollback<A: GitHubApi>(
    api: &A,
    request: &RollbackRequest,
) -> Result<RollbackOutcome, CommandError> {
    let repo = parse_repo(&request.repository)?;
    let explicit = request
        .strategy
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<RollbackStrategy>)
        .transpose()?;

    let mut latest = None;
    let strategy = match explicit {
        Some(strategy) => strategy,
        None => {
            let runs = latest_runs(api, &repo).await?;
            let strategy = determine_strategy(&runs);
            debug!(repository = %repo, %strategy, "selected rollback strategy");
            latest = Some(runs);
            strategy
        }
    };

    if request.dry_run {
        return Ok(RollbackOutcome {
            success: true,
            strategy,
            message: format!(
                "{} Would execute {} rollback on {}",
                DRY_RUN_PREFIX, strategy, repo
            ),
            run_url: None,
        });
    }

    match strategy {
        RollbackStrategy::Rerun => {
            let run_id = match request.run_id {
                Some(run_id) => run_id,
                None => {
                    let runs = match latest {
                        Some(runs) => runs,
                        None => latest_runs(api, &repo).await?,
                    };
                    runs.first().map(|run| run.id).ok_or(CommandError::NoWorkflowRuns)?
                }
            };

            api.rerun_workflow(&repo, run_id)
                .await
                .map_err(CommandError::api(format!("rerun workflow run {}", run_id)))?;
            info!(repository = %repo, %run_id, "rollback rerun triggered");

            Ok(RollbackOutcome {
                success: true,
                strategy,
                message: format!("Rerun triggered for run ID {}", run_id),
                run_url: Some(format!(
                    "https://github.com/{}/actions/runs/{}",
                    repo, run_id
                )),
            })
        }

        RollbackStrategy::TriggerWorkflow => {
            let workflow_id = request.workflow_id.ok_or(CommandError::MissingWorkflowId)?;
            let target = api
                .get_repository(&repo)
                .await
                .map_err(CommandError::api("get repository"))?;

            api.trigger_workflow(&repo, &workflow_id.to_string(), &target.default_branch)
                .await
                .map_err(CommandError::api(format!("trigger workflow {}", workflow_id)))?;
            info!(repository = %repo, workflow_id, branch = %target.default_branch, "rollback workflow dispatched");

            Ok(RollbackOutcome {
                success: true,
                strategy,
                message: format!(
                    "Workflow {} triggered on {}",
                    workflow_id, target.default_branch
                ),
                run_url: None,
            })
        }

        RollbackStrategy::Revert => Ok(RollbackOutcome {
            success: false,
            strategy,
            message: REVERT_MESSAGE.to_string(),
            run_url: None,
        }),
    }
}

async fn latest_runs<A: GitHubApi>(
    api: &A,
    repo: &RepoId,
) -> Result<Vec<WorkflowRun>, CommandError> {
    api.list_workflow_runs(&RunFilter::new(repo.clone()).with_limit(1))
        .await
        .map_err(CommandError::api("list workflow runs"))
}
