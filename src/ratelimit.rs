//! GitHub rate limit handling.
//!
//! Every remote call goes through [`RateLimitPolicy::execute`]. When GitHub
//! signals a rate limit, the policy is asked for a [`RetryDecision`] given a
//! [`RateLimitEvent`]. The only state kept is the attempt counter of the call
//! in progress.

use crate::error::FetchError;
use crate::github::{CallError, GitHubApi};
use backon::{ConstantBuilder, Retryable};
use std::cell::Cell;
use std::fmt;
use std::time::Duration;

/// Default number of attempts for a call hitting the primary rate limit.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay assumed for a secondary rate limit without a `retry-after` header.
const DEFAULT_SECONDARY_DELAY_SECS: u64 = 60;

/// Which of GitHub's rate limits was hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitKind {
    /// Quota exhausted. The reset time tells us how long to wait.
    Primary,
    /// Abuse / burst detection. Not tied to the quota.
    Secondary,
}

impl fmt::Display for RateLimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitKind::Primary => f.write_str("primary"),
            RateLimitKind::Secondary => f.write_str("secondary"),
        }
    }
}

/// Rate limit signal extracted from a single response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitSignal {
    pub kind: RateLimitKind,
    /// Delay suggested by the server.
    pub retry_after: Duration,
}

/// A rate limit signal in the context of the call that received it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitEvent {
    pub kind: RateLimitKind,
    /// 1-based number of the attempt that was throttled.
    pub attempt: u32,
    pub retry_after: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Abort,
}

/// Rate limit headers of a failed response, as raw strings.
#[derive(Clone, Debug, Default)]
pub struct RateLimitHeaders<'a> {
    pub remaining: Option<&'a str>,
    pub reset: Option<&'a str>,
    pub retry_after: Option<&'a str>,
}

/// Classifies a non-success response as a rate limit signal, if it is one.
///
/// Mirrors GitHub's documented behavior: an exhausted quota
/// (`x-ratelimit-remaining: 0`) is the primary limit and resets at
/// `x-ratelimit-reset`; a message mentioning the secondary rate limit, or a
/// `retry-after` header, is the secondary limit.
pub fn classify(
    status: u16,
    headers: &RateLimitHeaders<'_>,
    message: &str,
    now_epoch_secs: u64,
) -> Option<RateLimitSignal> {
    if !matches!(status, 403 | 429) {
        return None;
    }

    if message.to_lowercase().contains("secondary rate limit") {
        let secs = parse_secs(headers.retry_after).unwrap_or(DEFAULT_SECONDARY_DELAY_SECS);
        return Some(RateLimitSignal {
            kind: RateLimitKind::Secondary,
            retry_after: Duration::from_secs(secs),
        });
    }

    if headers.remaining.map(str::trim) == Some("0") {
        let reset = parse_secs(headers.reset).unwrap_or(now_epoch_secs);
        return Some(RateLimitSignal {
            kind: RateLimitKind::Primary,
            retry_after: Duration::from_secs(reset.saturating_sub(now_epoch_secs)),
        });
    }

    parse_secs(headers.retry_after).map(|secs| RateLimitSignal {
        kind: RateLimitKind::Secondary,
        retry_after: Duration::from_secs(secs),
    })
}

fn parse_secs(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Bounded retry policy for rate limited calls.
#[derive(Clone, Debug)]
pub struct RateLimitPolicy {
    max_attempts: u32,
    max_delay: Option<Duration>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RateLimitPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            max_delay: None,
        }
    }

    /// Caps the delay honored between attempts.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Primary limits are retried with the server delay until the attempt
    /// bound is reached. Secondary limits are never retried.
    pub fn decide(&self, event: &RateLimitEvent) -> RetryDecision {
        match event.kind {
            RateLimitKind::Secondary => RetryDecision::Abort,
            RateLimitKind::Primary if event.attempt < self.max_attempts => {
                let delay = match self.max_delay {
                    Some(max) => event.retry_after.min(max),
                    None => event.retry_after,
                };
                RetryDecision::Retry(delay)
            }
            RateLimitKind::Primary => RetryDecision::Abort,
        }
    }

    /// Issues `GET route` through `api`, retrying as [`decide`](Self::decide) allows.
    ///
    /// The backoff only bounds the number of retries; the delay itself always
    /// comes from the server signal.
    pub async fn execute<A: GitHubApi>(
        &self,
        api: &A,
        route: &str,
    ) -> Result<String, FetchError> {
        let attempt = Cell::new(0u32);
        let counter = &attempt;

        let backoff = ConstantBuilder::default()
            .with_delay(Duration::ZERO)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);

        let result = (move || async move {
            counter.set(counter.get() + 1);
            api.get(route).await
        })
        .retry(backoff)
        .when(|err| matches!(err, CallError::RateLimited(_)))
        .adjust(|err, backoff| match (err, backoff) {
            (CallError::RateLimited(signal), Some(_)) => match self.decide(&RateLimitEvent {
                kind: signal.kind,
                attempt: attempt.get(),
                retry_after: signal.retry_after,
            }) {
                RetryDecision::Retry(delay) => Some(delay),
                RetryDecision::Abort => None,
            },
            _ => None,
        })
        .notify(|err, delay| {
            if let CallError::RateLimited(signal) = err {
                tracing::warn!(
                    kind = %signal.kind,
                    method = "GET",
                    url = route,
                    attempt = attempt.get(),
                    delay = ?delay,
                    "Rate limit hit, retrying"
                );
            }
        })
        .await;

        match result {
            Ok(body) => Ok(body),
            Err(CallError::Failed(e)) => Err(e),
            Err(CallError::RateLimited(signal)) => {
                tracing::warn!(
                    kind = %signal.kind,
                    method = "GET",
                    url = route,
                    attempts = attempt.get(),
                    "Rate limit hit, giving up"
                );
                Err(FetchError::RateLimited {
                    kind: signal.kind,
                    url: route.to_string(),
                    attempts: attempt.get(),
                })
            }
        }
    }
}
