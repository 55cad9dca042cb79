//! GitHub Actions workflow run types and rollback strategies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{RepoId, RunId};

/// Conclusion of a completed workflow run.
///
/// GitHub reports several more values (`neutral`, `timed_out`,
/// `action_required`, ...) and `null` while a run is in progress; all of those
/// collapse to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    #[default]
    Unknown,
}

impl RunConclusion {
    /// Maps the REST `conclusion` field.
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("success") => RunConclusion::Success,
            Some("failure") => RunConclusion::Failure,
            Some("cancelled") => RunConclusion::Cancelled,
            Some("skipped") => RunConclusion::Skipped,
            _ => RunConclusion::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub name: String,
    pub workflow_id: u64,
    pub head_branch: Option<String>,
    pub head_sha: String,
    /// `queued`, `in_progress`, `completed`, ...
    pub status: String,
    pub conclusion: RunConclusion,
    pub html_url: String,
    pub run_number: u64,
    pub run_attempt: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub repository: String,
    pub actor: Option<String>,
    pub event: String,
}

/// Default number of workflow runs returned by a listing.
pub const DEFAULT_RUN_LIMIT: usize = 10;

/// Filter for workflow run listings. Runs are returned newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFilter {
    pub repository: RepoId,
    pub branch: Option<String>,
    /// Workflow file name (e.g. `ci.yml`) or numeric workflow ID.
    pub workflow: Option<String>,
    pub limit: usize,
}

impl RunFilter {
    pub fn new(repository: RepoId) -> Self {
        Self {
            repository,
            branch: None,
            workflow: None,
            limit: DEFAULT_RUN_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// How a bad deployment is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStrategy {
    /// Re-run a failed workflow run.
    Rerun,
    /// Revert the offending commits. Always left to a human.
    Revert,
    /// Dispatch an alternate workflow on the default branch.
    #[serde(rename = "workflow")]
    TriggerWorkflow,
}

impl RollbackStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollbackStrategy::Rerun => "rerun",
            RollbackStrategy::Revert => "revert",
            RollbackStrategy::TriggerWorkflow => "workflow",
        }
    }
}

impl fmt::Display for RollbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rollback strategy: {0}")]
pub struct InvalidRollbackStrategy(pub String);

impl FromStr for RollbackStrategy {
    type Err = InvalidRollbackStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rerun" => Ok(RollbackStrategy::Rerun),
            "revert" => Ok(RollbackStrategy::Revert),
            "workflow" | "trigger_workflow" => Ok(RollbackStrategy::TriggerWorkflow),
            other => Err(InvalidRollbackStrategy(other.to_string())),
        }
    }
}

/// Result of a rollback request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub success: bool,
    pub strategy: RollbackStrategy,
    pub message: String,
    pub run_url: Option<String>,
}
