//! Pure decision logic over adapter results.
//!
//! Nothing here performs I/O. The use-case layer fetches comparisons and
//! workflow runs through the adapter and hands them to these functions.

pub mod drift;
pub mod rollback;

pub use drift::{analyze_drift, drift_severity, has_significant_drift};
pub use rollback::{determine_strategy, recommended_actions, recommended_actions_for_label};
