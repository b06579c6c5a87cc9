//! In-memory `GitHubApi` used by unit tests.

use crate::error::FetchError;
use crate::github::{CallError, GitHubApi};
use crate::ratelimit::{RateLimitKind, RateLimitSignal};
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;

/// Replays scripted responses per route, in push order.
///
/// A route with no scripted response left answers 404.
#[derive(Default)]
pub struct ScriptedApi {
    responses: RefCell<HashMap<String, VecDeque<Result<String, CallError>>>>,
    calls: RefCell<HashMap<String, usize>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_body(&self, route: &str, body: &str) {
        self.push(route, Ok(body.to_string()));
    }

    pub fn push_rate_limited(
        &self,
        route: &str,
        kind: RateLimitKind,
        retry_after: std::time::Duration,
    ) {
        self.push(
            route,
            Err(CallError::RateLimited(RateLimitSignal { kind, retry_after })),
        );
    }

    pub fn push_status(&self, route: &str, status: u16) {
        self.push(
            route,
            Err(CallError::Failed(FetchError::Status {
                url: route.to_string(),
                status,
                message: "scripted failure".to_string(),
            })),
        );
    }

    fn push(&self, route: &str, response: Result<String, CallError>) {
        self.responses
            .borrow_mut()
            .entry(route.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self, route: &str) -> usize {
        self.calls.borrow().get(route).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }
}

impl GitHubApi for ScriptedApi {
    async fn get(&self, route: &str) -> Result<String, CallError> {
        *self.calls.borrow_mut().entry(route.to_string()).or_default() += 1;

        let next = self
            .responses
            .borrow_mut()
            .get_mut(route)
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| {
            Err(CallError::Failed(FetchError::Status {
                url: route.to_string(),
                status: 404,
                message: "Not Found".to_string(),
            }))
        })
    }
}

/// JSON page of issues numbered `numbers`, each with `reactions` total reactions.
pub fn issues_json(numbers: RangeInclusive<u64>, reactions: u64) -> String {
    let issues: Vec<serde_json::Value> = numbers
        .map(|n| {
            serde_json::json!({
                "number": n,
                "html_url": format!("https://github.com/w3c/csswg-drafts/issues/{n}"),
                "title": format!("Issue {n}"),
                "reactions": { "total_count": reactions },
            })
        })
        .collect();
    serde_json::Value::Array(issues).to_string()
}

/// JSON page of reactions created `ages` before `now`.
pub fn reactions_json(now: DateTime<Utc>, ages: &[Duration]) -> String {
    let reactions: Vec<serde_json::Value> = ages
        .iter()
        .map(|age| serde_json::json!({ "content": "+1", "created_at": (now - *age).to_rfc3339() }))
        .collect();
    serde_json::Value::Array(reactions).to_string()
}
