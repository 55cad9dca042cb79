//! Drift classification between a base and a head branch.
//!
//! The rules deliberately ignore commit counts when no file changed: a merge
//! commit that brings no content still shows up in `ahead_by`/`behind_by`,
//! and reporting it as drift would be a false positive.

use crate::types::{DriftSeverity, DriftStatus, RefComparison, UpstreamStatus};

/// Upper bound (inclusive) of `ahead_by + behind_by` for [`DriftSeverity::Low`].
pub const LOW_SEVERITY_MAX: u64 = 5;

/// Upper bound (inclusive) of `ahead_by + behind_by` for [`DriftSeverity::Medium`].
pub const MEDIUM_SEVERITY_MAX: u64 = 20;

/// Classifies how the two refs of a comparison relate.
pub fn analyze_drift(comparison: &RefComparison) -> DriftStatus {
    if comparison.upstream_status == UpstreamStatus::Identical
        || comparison.changed_files.is_empty()
    {
        return DriftStatus::None;
    }

    match (comparison.ahead_by > 0, comparison.behind_by > 0) {
        (true, true) => DriftStatus::Diverged,
        (true, false) => DriftStatus::BaseAhead,
        (false, true) => DriftStatus::HeadAhead,
        (false, false) => DriftStatus::None,
    }
}

/// Buckets the commit distance between the refs.
///
/// Always `None` when no file changed, whatever the commit counts say.
pub fn drift_severity(comparison: &RefComparison) -> DriftSeverity {
    if comparison.changed_files.is_empty() {
        return DriftSeverity::None;
    }

    let total = u64::from(comparison.ahead_by) + u64::from(comparison.behind_by);
    match total {
        0 => DriftSeverity::None,
        t if t <= LOW_SEVERITY_MAX => DriftSeverity::Low,
        t if t <= MEDIUM_SEVERITY_MAX => DriftSeverity::Medium,
        _ => DriftSeverity::High,
    }
}

/// True iff the comparison carries at least one file change.
pub fn has_significant_drift(comparison: &RefComparison) -> bool {
    !comparison.changed_files.is_empty()
}
