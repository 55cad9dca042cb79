//! Errors surfaced by the use-case layer.

use thiserror::Error;

use crate::github::GitHubApiError;
use crate::types::{InvalidMergeMethod, InvalidRepoId, InvalidRollbackStrategy, PrNumber, PrState};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    InvalidRepository(#[from] InvalidRepoId),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    InvalidMergeMethod(#[from] InvalidMergeMethod),

    #[error(transparent)]
    InvalidRollbackStrategy(#[from] InvalidRollbackStrategy),

    #[error("PR {number} is not open (state: {state})")]
    PullRequestNotOpen { number: PrNumber, state: PrState },

    #[error("PR {0} has merge conflicts, resolve them before merging")]
    MergeConflicts(PrNumber),

    #[error("refusing to delete protected branch '{0}'")]
    ProtectedBranch(String),

    #[error("no workflow runs found")]
    NoWorkflowRuns,

    #[error("workflow_id required for workflow strategy")]
    MissingWorkflowId,

    /// A remote call failed. `step` names what was being attempted.
    #[error("failed to {step}: {source}")]
    Api {
        step: String,
        #[source]
        source: GitHubApiError,
    },
}

impl CommandError {
    /// Wraps an adapter error with the step that failed, for use with
    /// `map_err`.
    pub fn api(step: impl Into<String>) -> impl FnOnce(GitHubApiError) -> CommandError {
        let step = step.into();
        move |source| CommandError::Api { step, source }
    }

    /// The underlying adapter error, if this is one.
    pub fn api_error(&self) -> Option<&GitHubApiError> {
        match self {
            CommandError::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}
