//! Rollback strategy selection and drift remediation advice.

use crate::types::{DriftStatus, RollbackStrategy, RunConclusion, WorkflowRun};

/// Picks a rollback strategy from recent workflow runs, newest first.
///
/// Only the most recent run is consulted. A failed run can be re-run;
/// anything else (including no runs at all) leaves a revert as the only
/// option.
pub fn determine_strategy(recent_runs: &[WorkflowRun]) -> RollbackStrategy {
    match recent_runs.first() {
        Some(run) if run.conclusion == RunConclusion::Failure => RollbackStrategy::Rerun,
        _ => RollbackStrategy::Revert,
    }
}

const SYNCED_ACTIONS: &[&str] = &["No action needed - branches are synced"];

const BASE_AHEAD_ACTIONS: &[&str] = &[
    "Create sync PR to merge base branch into head branch",
    "Cherry-pick specific commits to head branch",
];

const HEAD_AHEAD_ACTIONS: &[&str] = &[
    "Create PR to merge head branch into base branch",
    "Review and merge pending PRs",
];

const DIVERGED_ACTIONS: &[&str] = &[
    "Review diverged commits carefully",
    "Consider rebasing head branch on base branch",
    "Create sync PR with manual conflict resolution",
];

const UNKNOWN_ACTIONS: &[&str] = &["Unknown drift status"];

/// Fixed, ordered remediation steps for a drift status.
pub fn recommended_actions(status: DriftStatus) -> &'static [&'static str] {
    match status {
        DriftStatus::None => SYNCED_ACTIONS,
        DriftStatus::BaseAhead => BASE_AHEAD_ACTIONS,
        DriftStatus::HeadAhead => HEAD_AHEAD_ACTIONS,
        DriftStatus::Diverged => DIVERGED_ACTIONS,
    }
}

/// Like [`recommended_actions`], for a status label received from outside
/// the crate. Unrecognized labels yield a single "unknown" action.
pub fn recommended_actions_for_label(label: &str) -> &'static [&'static str] {
    label
        .parse::<DriftStatus>()
        .map(recommended_actions)
        .unwrap_or(UNKNOWN_ACTIONS)
}
