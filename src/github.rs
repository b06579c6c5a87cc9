use crate::error::FetchError;
use crate::ratelimit::{self, RateLimitHeaders, RateLimitSignal};
use anyhow::Result;
use chrono::Utc;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::Deserialize;

/// Outcome of a single failed GET.
#[derive(Debug)]
pub enum CallError {
    /// GitHub throttled the request. Whether to retry is up to the rate limit policy.
    RateLimited(RateLimitSignal),
    /// Any other failure. Never retried.
    Failed(FetchError),
}

impl From<FetchError> for CallError {
    fn from(e: FetchError) -> Self {
        CallError::Failed(e)
    }
}

impl From<octocrab::Error> for CallError {
    fn from(e: octocrab::Error) -> Self {
        CallError::Failed(FetchError::GitHub(e))
    }
}

/// The read-only slice of the GitHub REST API the survey needs.
///
/// `route` is a path relative to the API root, including the query string
/// (e.g. `/repos/w3c/csswg-drafts/issues?per_page=100&page=1`).
#[allow(async_fn_in_trait)]
pub trait GitHubApi {
    /// Issues one GET and returns the body of a successful response.
    async fn get(&self, route: &str) -> Result<String, CallError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::connect(None, token)
    }

    /// Client for a GitHub API served somewhere other than `api.github.com`.
    pub fn with_base_uri(base_uri: &str, token: Option<String>) -> Result<Self> {
        Self::connect(Some(base_uri), token)
    }

    fn connect(base_uri: Option<&str>, token: Option<String>) -> Result<Self> {
        // Retries belong to `RateLimitPolicy`; octocrab would otherwise retry
        // 429 and 5xx responses on its own.
        let mut builder = Octocrab::builder().add_retry_config(RetryConfig::None);
        if let Some(base_uri) = base_uri {
            builder = builder.base_uri(base_uri)?;
        }
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        Ok(Self {
            octocrab: builder.build()?,
        })
    }
}

impl GitHubApi for GitHubClient {
    async fn get(&self, route: &str) -> Result<String, CallError> {
        let response = self.octocrab._get(route).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(self.octocrab.body_to_string(response).await?);
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let remaining = header("x-ratelimit-remaining");
        let reset = header("x-ratelimit-reset");
        let retry_after = header("retry-after");

        let body = self
            .octocrab
            .body_to_string(response)
            .await
            .unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        let headers = RateLimitHeaders {
            remaining: remaining.as_deref(),
            reset: reset.as_deref(),
            retry_after: retry_after.as_deref(),
        };
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();

        match ratelimit::classify(status.as_u16(), &headers, &message, now) {
            Some(signal) => Err(CallError::RateLimited(signal)),
            None => Err(CallError::Failed(FetchError::Status {
                url: route.to_string(),
                status: status.as_u16(),
                message,
            })),
        }
    }
}
