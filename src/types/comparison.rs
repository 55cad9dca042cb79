//! Ref comparison and drift classification types.
//!
//! A [`RefComparison`] is built fresh from each compare call and is never
//! cached. The only mutation after construction is attaching the computed
//! [`DriftStatus`] via [`RefComparison::with_drift`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::commit::Commit;
use super::ids::RepoId;

/// How the head ref relates to the base ref, as reported by the compare API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamStatus {
    Identical,
    Ahead,
    Behind,
    Diverged,
}

impl UpstreamStatus {
    /// Maps the REST `status` field. Unrecognized values are treated as
    /// diverged so that the file-change check still decides.
    pub fn from_api(value: &str) -> Self {
        match value {
            "identical" => UpstreamStatus::Identical,
            "ahead" => UpstreamStatus::Ahead,
            "behind" => UpstreamStatus::Behind,
            _ => UpstreamStatus::Diverged,
        }
    }
}

/// One changed file between two refs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileDelta {
    pub path: String,
    /// `added`, `modified`, `removed`, `renamed`, ...
    pub change_kind: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    pub patch: Option<String>,
}

impl FileDelta {
    pub fn new(path: impl Into<String>, change_kind: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            change_kind: change_kind.into(),
            ..Default::default()
        }
    }
}

/// Whether two branches have meaningfully diverged.
///
/// Merge commits that bring no file changes never count as drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// The branches carry the same content.
    #[serde(rename = "synced")]
    None,
    /// The base branch has commits the head branch lacks.
    BaseAhead,
    /// The head branch has commits the base branch lacks.
    HeadAhead,
    /// Both branches have commits the other lacks.
    Diverged,
}

impl DriftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatus::None => "synced",
            DriftStatus::BaseAhead => "base_ahead",
            DriftStatus::HeadAhead => "head_ahead",
            DriftStatus::Diverged => "diverged",
        }
    }
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" | "none" => Ok(DriftStatus::None),
            "base_ahead" => Ok(DriftStatus::BaseAhead),
            "head_ahead" => Ok(DriftStatus::HeadAhead),
            "diverged" => Ok(DriftStatus::Diverged),
            other => Err(format!("unknown drift status '{other}'")),
        }
    }
}

/// Coarse magnitude of drift, bucketed on `ahead_by + behind_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for DriftSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriftSeverity::None => "none",
            DriftSeverity::Low => "low",
            DriftSeverity::Medium => "medium",
            DriftSeverity::High => "high",
        };
        f.write_str(s)
    }
}

/// Result of comparing `base_ref...head_ref` in one repository.
///
/// `ahead_by` and `behind_by` are passed through from the compare API
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefComparison {
    pub repository: RepoId,
    pub base_ref: String,
    pub head_ref: String,
    pub ahead_by: u32,
    pub behind_by: u32,
    pub total_commits: u32,
    pub upstream_status: UpstreamStatus,
    pub commits: Vec<Commit>,
    pub changed_files: Vec<FileDelta>,
    pub drift: Option<DriftStatus>,
}

impl RefComparison {
    pub fn new(
        repository: RepoId,
        base_ref: impl Into<String>,
        head_ref: impl Into<String>,
        upstream_status: UpstreamStatus,
    ) -> Self {
        Self {
            repository,
            base_ref: base_ref.into(),
            head_ref: head_ref.into(),
            ahead_by: 0,
            behind_by: 0,
            total_commits: 0,
            upstream_status,
            commits: Vec::new(),
            changed_files: Vec::new(),
            drift: None,
        }
    }

    /// Attaches a computed drift classification.
    pub fn with_drift(mut self, drift: DriftStatus) -> Self {
        self.drift = Some(drift);
        self
    }
}
