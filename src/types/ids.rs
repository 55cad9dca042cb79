//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a run ID
//! where a PR number is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrNumber(pub u64);

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PrNumber {
    fn from(n: u64) -> Self {
        PrNumber(n)
    }
}

/// A GitHub Actions workflow run ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunId {
    fn from(n: u64) -> Self {
        RunId(n)
    }
}

/// A git commit SHA.
///
/// Not validated: GitHub is the only producer and we pass SHAs back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(pub String);

impl Sha {
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sha {
    fn from(s: String) -> Self {
        Sha(s)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

/// Error returned when a repository identifier is not in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository format {input:?}, expected owner/repo")]
pub struct InvalidRepoId {
    pub input: String,
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses an `owner/name` identifier.
    ///
    /// Exactly two non-empty segments are required; `a/b/c`, `/b` and `a` are
    /// all rejected.
    pub fn parse(input: &str) -> Result<Self, InvalidRepoId> {
        let invalid = || InvalidRepoId {
            input: input.to_string(),
        };

        let (owner, repo) = input.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid());
        }

        Ok(RepoId::new(owner, repo))
    }

    /// Returns the `owner/name` form.
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl std::str::FromStr for RepoId {
    type Err = InvalidRepoId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pr_number {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_format(n: u64) {
                let pr = PrNumber(n);
                prop_assert_eq!(format!("{}", pr), format!("#{}", n));
            }
        }
    }

    mod sha {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn short_returns_7_chars(s in "[0-9a-f]{40}") {
                let sha = Sha::new(&s);
                prop_assert_eq!(sha.short().len(), 7);
                prop_assert_eq!(sha.short(), &s[..7]);
            }
        }

        #[test]
        fn short_handles_short_input() {
            let sha = Sha::new("abc");
            assert_eq!(sha.short(), "abc");
        }
    }

    mod repo_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_accepts_display_output(
                owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
                repo in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}"
            ) {
                let id = RepoId::new(&owner, &repo);
                let parsed = RepoId::parse(&id.to_string()).unwrap();
                prop_assert_eq!(id, parsed);
            }
        }

        #[test]
        fn parse_rejects_malformed_identifiers() {
            for input in ["", "octo", "octo/", "/app", "octo/app/extra", "/"] {
                let err = RepoId::parse(input).unwrap_err();
                assert_eq!(err.input, input);
            }
        }

        #[test]
        fn error_message_names_expected_format() {
            let err = RepoId::parse("nope").unwrap_err();
            assert!(err.to_string().contains("expected owner/repo"));
        }

        #[test]
        fn from_str_delegates_to_parse() {
            let id: RepoId = "octo/app".parse().unwrap();
            assert_eq!(id, RepoId::new("octo", "app"));
            assert_eq!(id.full_name(), "octo/app");
        }
    }
}
