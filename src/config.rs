//! Runtime configuration.
//!
//! The token and tuning knobs come from the environment (optionally seeded
//! from `.env` files); per-repository branch pairs come from a JSON file.
//!
//! ```json
//! {
//!   "default": { "base_branch": "main", "head_branch": "develop" },
//!   "repositories": {
//!     "octo/app": { "prod_branch": "production", "dev_branch": "staging" }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::CacheConfig;
use crate::github::{DEFAULT_RATE_LIMIT_THRESHOLD, RetryConfig};

/// Directory under `$HOME` holding `.env` and `repos.json`.
pub const CONFIG_DIR: &str = ".repo-monitor";

/// Overrides the location of the branch configuration file.
pub const CONFIG_PATH_ENV: &str = "REPO_MONITOR_CONFIG";

pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_HEAD_BRANCH: &str = "develop";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid branch name: {field} {problem} for {scope}")]
    InvalidBranchName {
        scope: String,
        field: &'static str,
        problem: &'static str,
    },
}

/// The branch pair compared for drift in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfig {
    /// The release branch (`main`, `production`).
    #[serde(alias = "prod_branch")]
    pub base_branch: String,
    /// The integration branch (`develop`, `staging`).
    #[serde(alias = "dev_branch")]
    pub head_branch: String,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            head_branch: DEFAULT_HEAD_BRANCH.to_string(),
        }
    }
}

impl BranchConfig {
    pub fn new(base_branch: impl Into<String>, head_branch: impl Into<String>) -> Self {
        Self {
            base_branch: base_branch.into(),
            head_branch: head_branch.into(),
        }
    }

    fn validate(&self, scope: &str) -> Result<(), ConfigError> {
        for (field, name) in [
            ("base_branch", &self.base_branch),
            ("head_branch", &self.head_branch),
        ] {
            let problem = if name.is_empty() {
                "is empty"
            } else if name.chars().any(char::is_whitespace) {
                "contains whitespace"
            } else {
                continue;
            };
            return Err(ConfigError::InvalidBranchName {
                scope: scope.to_string(),
                field,
                problem,
            });
        }
        Ok(())
    }
}

/// Branch pairs: one default plus per-repository overrides keyed by
/// `owner/name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReposConfig {
    #[serde(default)]
    pub default: BranchConfig,
    #[serde(default)]
    pub repositories: HashMap<String, BranchConfig>,
}

impl ReposConfig {
    /// Loads and validates `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "branch config not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: ReposConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        info!(
            path = %path.display(),
            default_base = %config.default.base_branch,
            default_head = %config.default.head_branch,
            custom_repos = config.repositories.len(),
            "loaded branch config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default.validate("default")?;
        for (repo, branches) in &self.repositories {
            branches.validate(repo)?;
        }
        Ok(())
    }

    /// The override for `repo` (`owner/name`), else the default pair.
    pub fn branch_config(&self, repo: &str) -> &BranchConfig {
        self.repositories.get(repo).unwrap_or(&self.default)
    }
}

/// Tuning for the live GitHub client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientConfig {
    /// Remaining-request count at or below which calls wait for the reset.
    pub rate_limit_threshold: u32,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rate_limit_threshold: DEFAULT_RATE_LIMIT_THRESHOLD,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Reads `REPO_MONITOR_RATE_LIMIT_THRESHOLD` and
    /// `REPO_MONITOR_MAX_ATTEMPTS`. Unset or unparsable values keep defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rate_limit_threshold = env_parse("REPO_MONITOR_RATE_LIMIT_THRESHOLD")
            .unwrap_or(defaults.rate_limit_threshold);
        let max_attempts =
            env_parse("REPO_MONITOR_MAX_ATTEMPTS").unwrap_or(defaults.retry.max_attempts);

        ClientConfig {
            rate_limit_threshold,
            retry: RetryConfig {
                max_attempts: max_attempts.max(1),
                ..defaults.retry
            },
        }
    }
}

fn cache_config_from_env() -> CacheConfig {
    let defaults = CacheConfig::default();
    CacheConfig {
        default_ttl: env_parse("REPO_MONITOR_CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_ttl),
        ..defaults
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub repos: ReposConfig,
    pub client: ClientConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Loads `.env` files, then reads the environment and the branch config.
    ///
    /// Variables already set in the process win over `.env` values, and the
    /// working directory's `.env` wins over the one in the config directory.
    pub fn load() -> Result<Self, ConfigError> {
        load_env_files();

        let github_token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let repos = match repos_config_path(std::env::var_os(CONFIG_PATH_ENV), home_dir()) {
            Some(path) => ReposConfig::load_from(&path)?,
            None => {
                debug!("no home directory, using default branch config");
                ReposConfig::default()
            }
        };

        info!(
            has_token = github_token.is_some(),
            repos_configured = repos.repositories.len(),
            "config loaded"
        );

        Ok(Config {
            github_token,
            repos,
            client: ClientConfig::from_env(),
            cache: cache_config_from_env(),
        })
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

fn load_env_files() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }
    if let Some(home) = home_dir() {
        let path = home.join(CONFIG_DIR).join(".env");
        if dotenvy::from_path(&path).is_ok() {
            debug!(path = %path.display(), "loaded .env from config directory");
        }
    }
}

/// An explicit path wins; otherwise `<home>/.repo-monitor/repos.json`.
fn repos_config_path(
    explicit: Option<std::ffi::OsString>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(CONFIG_DIR).join("repos.json")))
}
