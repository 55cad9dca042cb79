//! Raw HTTP transport to the GitHub REST API.
//!
//! The transport knows nothing about retries, rate budgets or domain types.
//! It sends one request and hands back the status, the rate-limit headers,
//! the next pagination page and the body. Any HTTP status is an `Ok`
//! response; `Err` means no response arrived at all.
//!
//! The trait-based design keeps the adapter testable against a scripted
//! transport (see `test_utils::ScriptedTransport`).

use std::future::Future;

use octocrab::Octocrab;

use super::error::GitHubApiError;
use super::rate_limit::RateLimitHeaders;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// A REST call relative to the API root (e.g. `/repos/octo/app/pulls`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Put, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Returns the value of a query parameter, if set.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path plus percent-encoded query string.
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub rate_limit: RateLimitHeaders,
    /// Page number from the `Link: <...>; rel="next"` header.
    pub next_page: Option<u32>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends raw requests to GitHub.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, GitHubApiError>> + Send;
}

/// Production transport on top of octocrab's raw request methods, which keep
/// response headers visible.
#[derive(Clone)]
pub struct OctocrabTransport {
    client: Octocrab,
}

impl OctocrabTransport {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a transport authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, GitHubApiError> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .build()
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(Self::new(client))
    }

    pub fn inner(&self) -> &Octocrab {
        &self.client
    }
}

impl std::fmt::Debug for OctocrabTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabTransport").finish_non_exhaustive()
    }
}

impl Transport for OctocrabTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GitHubApiError> {
        let uri = request.uri();
        let body = request.body.as_ref();

        let response = match request.method {
            HttpMethod::Get => self.client._get(uri).await,
            HttpMethod::Post => self.client._post(uri, body).await,
            HttpMethod::Put => self.client._put(uri, body).await,
            HttpMethod::Patch => self.client._patch(uri, body).await,
            HttpMethod::Delete => self.client._delete(uri, body).await,
        }
        .map_err(GitHubApiError::from_octocrab)?;

        let status = response.status().as_u16();
        let (rate_limit, next_page) = {
            let headers = response.headers();
            let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
            (
                RateLimitHeaders::from_header_values(
                    header("x-ratelimit-remaining"),
                    header("x-ratelimit-reset"),
                ),
                header("link").and_then(parse_next_page),
            )
        };

        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(ApiResponse {
            status,
            rate_limit,
            next_page,
            body,
        })
    }
}

/// Extracts the `page` parameter of the `rel="next"` entry of a Link header.
pub fn parse_next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().eq_ignore_ascii_case(r#"rel="next""#));
        if !is_next {
            return None;
        }

        let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let (_, query) = url.split_once('?')?;
        query.split('&').find_map(|pair| match pair.split_once('=') {
            Some(("page", value)) => value.parse().ok(),
            _ => None,
        })
    })
}
