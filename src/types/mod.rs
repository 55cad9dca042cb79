//! Core domain types for the repository monitor.
//!
//! These are the shapes the adapter maps REST payloads into and the use-case
//! layer consumes. Identifiers are newtypes so that a run ID cannot be passed
//! where a PR number is expected.

pub mod commit;
pub mod comparison;
pub mod ids;
pub mod pull_request;
pub mod repository;
pub mod workflow;

// Re-export commonly used types at the module level
pub use commit::{Commit, CommitFilter, DEFAULT_COMMIT_LIMIT};
pub use comparison::{DriftSeverity, DriftStatus, FileDelta, RefComparison, UpstreamStatus};
pub use ids::{InvalidRepoId, PrNumber, RepoId, RunId, Sha};
pub use pull_request::{
    DEFAULT_PR_LIMIT, InvalidMergeMethod, MergeMethod, MergeOutcome, NewPullRequest, PrFilter,
    PrState, PrStateFilter, PullRequest,
};
pub use repository::{Repository, RepositoryStatus};
pub use workflow::{
    DEFAULT_RUN_LIMIT, InvalidRollbackStrategy, RollbackOutcome, RollbackStrategy, RunConclusion,
    RunFilter, WorkflowRun,
};
