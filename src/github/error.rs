//! GitHub API error types.
//!
//! Errors are classified up front so the retry loop can decide without knowing
//! which operation failed:
//!
//! - **Transient** errors are retried (429, 500, 502, 503, 504, and 403s whose
//!   message is a rate-limit shape)
//! - **Permanent** errors are returned on first occurrence (validation,
//!   not-found, permission, conflict, undecodable bodies, and transport failures
//!   that never produced a response)
//! - **Cancelled** is produced only by the crate itself when a cancellation
//!   token fires during a rate-limit wait or a backoff sleep

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Transient error - safe to retry with backoff.
    Transient,

    /// Permanent error - retrying cannot help.
    Permanent,

    /// The caller cancelled the operation while it was waiting.
    Cancelled,
}

impl GitHubErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
///
/// `operation` and `target` are attached by the adapter once the retry loop
/// has finished; they never influence `kind` or `status_code`.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if a response was received.
    pub status_code: Option<u16>,

    pub message: String,

    /// Adapter operation that failed (e.g. `compare_refs`).
    pub operation: Option<&'static str>,

    /// What the operation was acting on (e.g. `octo/app#12`).
    pub target: Option<String>,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitHub API error")?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        match (self.operation, &self.target) {
            (Some(op), Some(target)) => write!(f, " in {} on {}", op, target)?,
            (Some(op), None) => write!(f, " in {}", op)?,
            (None, Some(target)) => write!(f, " on {}", target)?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

impl GitHubApiError {
    fn new(kind: GitHubErrorKind, status_code: Option<u16>, message: String) -> Self {
        Self {
            kind,
            status_code,
            message,
            operation: None,
            target: None,
            source: None,
        }
    }

    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Permanent, None, message.into())
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Transient, None, message.into())
    }

    /// Creates the error returned when a wait is interrupted by cancellation.
    pub fn cancelled(operation: &'static str) -> Self {
        let mut err = Self::new(
            GitHubErrorKind::Cancelled,
            None,
            "operation cancelled".to_string(),
        );
        err.operation = Some(operation);
        err
    }

    /// Classifies a non-2xx HTTP response.
    ///
    /// GitHub error bodies are `{"message": "...", "documentation_url": "..."}`;
    /// the `message` field is used when present, otherwise the raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    trimmed.to_string()
                }
            });

        Self::new(classify_status(status, &message), Some(status), message)
    }

    /// Creates a permanent error for a response body that did not match the
    /// expected shape.
    pub fn decode(err: serde_json::Error) -> Self {
        Self::permanent_without_source(format!("failed to decode response body: {}", err))
    }

    /// Categorizes an octocrab error.
    ///
    /// Errors that carry a GitHub response are classified by status like any
    /// other response. Everything else (connection, TLS, URI building) never
    /// reached GitHub and is permanent.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let (kind, status_code, message) = match &err {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                (
                    classify_status(status, &source.message),
                    Some(status),
                    source.message.clone(),
                )
            }
            other => (GitHubErrorKind::Permanent, None, other.to_string()),
        };

        Self {
            source: Some(err),
            ..Self::new(kind, status_code, message)
        }
    }

    /// Attaches the failing operation and its target.
    pub fn with_context(mut self, operation: &'static str, target: impl Into<String>) -> Self {
        self.operation = Some(operation);
        self.target = Some(target.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == GitHubErrorKind::Cancelled
    }

    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

/// Maps an HTTP status (plus the error message for 403s) to a retry class.
pub fn classify_status(status: u16, message: &str) -> GitHubErrorKind {
    match status {
        429 | 500 | 502 | 503 | 504 => GitHubErrorKind::Transient,
        403 if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        _ => GitHubErrorKind::Permanent,
    }
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}
