//! GitHub access layer.
//!
//! Key features:
//! - One capability trait ([`GitHubApi`]) for every operation
//! - Shared rate budget fed from `x-ratelimit-*` headers
//! - Exponential backoff retry that distinguishes transient from permanent failures
//! - TTL caching of repository and pull request listings

mod api;
mod cached;
mod client;
mod error;
mod models;
mod rate_limit;
mod retry;
mod transport;

pub use api::GitHubApi;
pub use cached::{CachedGitHubClient, cache_key};
pub use client::{GitHubClient, MAX_PER_PAGE};
pub use error::{GitHubApiError, GitHubErrorKind, classify_status};
pub use rate_limit::{
    DEFAULT_THRESHOLD as DEFAULT_RATE_LIMIT_THRESHOLD, MAX_WAIT as MAX_RATE_LIMIT_WAIT, RateBudget,
    RateLimitHeaders,
};
pub use retry::{RetryConfig, RetryResult, retry_with_backoff};
pub use transport::{
    ApiRequest, ApiResponse, HttpMethod, OctocrabTransport, Transport, parse_next_page,
};
