//! Pipeline driver for a survey run.
//!
//! This module implements `IssueSurvey`, the single forward pass over
//! repositories → issues → reactions:
//! 1. Listing every issue of each repository, in sorted repository order.
//! 2. Dropping issues below the reaction threshold.
//! 3. Draining the reactions of each remaining issue to count recent ones.
//! 4. Collecting the resulting records until the optional cap is reached.
//!
//! Every request is awaited before the next one is issued. The rate limit
//! budget is shared by all of them, so nothing runs concurrently.

use crate::aggregator::ReactionAggregator;
use crate::collector::ResultCollector;
use crate::config::{AggregationConfig, AppConfig, FetchErrorPolicy};
use crate::error::{FetchError, SurveyError};
use crate::fetcher::{self, Endpoint};
use crate::github::GitHubApi;
use crate::ratelimit::RateLimitPolicy;
use crate::types::{AggregatedRecord, Issue, Reaction, Repository};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::ops::ControlFlow;

/// Settings for a single survey run.
#[derive(Clone, Debug, Default)]
pub struct SurveyOptions {
    pub aggregation: AggregationConfig,
    /// Stop once this many records have been collected.
    pub max_records: Option<usize>,
    pub on_fetch_error: FetchErrorPolicy,
}

impl SurveyOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            aggregation: config.aggregation(),
            max_records: config.max_records,
            on_fetch_error: config.on_fetch_error,
        }
    }
}

/// A repository whose traversal was cut short by a fetch error.
#[derive(Debug)]
pub struct SkippedRepository {
    pub repo: Repository,
    pub error: FetchError,
}

/// Result of a completed run.
#[derive(Debug, Default)]
pub struct SurveyReport {
    /// Records in discovery order.
    pub records: Vec<AggregatedRecord>,
    /// Repositories abandoned under [`FetchErrorPolicy::SkipRepository`].
    pub skipped: Vec<SkippedRepository>,
}

pub struct IssueSurvey<'a, A> {
    api: &'a A,
    policy: RateLimitPolicy,
    options: SurveyOptions,
}

impl<'a, A: GitHubApi> IssueSurvey<'a, A> {
    pub fn new(api: &'a A, policy: RateLimitPolicy, options: SurveyOptions) -> Self {
        Self {
            api,
            policy,
            options,
        }
    }

    /// Surveys `repos` in the given order, measuring recency from the current time.
    pub async fn run(&self, repos: &[Repository]) -> Result<SurveyReport, SurveyError> {
        self.run_at(repos, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit reference time.
    pub async fn run_at(
        &self,
        repos: &[Repository],
        now: DateTime<Utc>,
    ) -> Result<SurveyReport, SurveyError> {
        let aggregator = ReactionAggregator::new(&self.options.aggregation, now)?;
        let mut collector = ResultCollector::new(self.options.max_records);
        let mut skipped = Vec::new();

        for repo in repos {
            if collector.is_full() {
                break;
            }

            tracing::info!(repo = %repo, "Surveying repository");

            match self.survey_repository(repo, &aggregator, &mut collector).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    tracing::info!(records = collector.len(), "Record limit reached");
                    break;
                }
                Err(error) => match self.options.on_fetch_error {
                    FetchErrorPolicy::Abort => {
                        tracing::error!(repo = %repo, "Aborting survey: {}", error);
                        return Err(error.into());
                    }
                    FetchErrorPolicy::SkipRepository => {
                        tracing::warn!(repo = %repo, "Skipping rest of repository: {}", error);
                        skipped.push(SkippedRepository {
                            repo: repo.clone(),
                            error,
                        });
                    }
                },
            }
        }

        Ok(SurveyReport {
            records: collector.into_records(),
            skipped,
        })
    }

    /// Walks one repository's issues, returning `Break` when the collector is full.
    async fn survey_repository(
        &self,
        repo: &Repository,
        aggregator: &ReactionAggregator,
        collector: &mut ResultCollector,
    ) -> Result<ControlFlow<()>, FetchError> {
        let issues = fetcher::paginate::<_, Issue>(
            self.api,
            &self.policy,
            Endpoint::Issues { repo: repo.clone() },
        );
        let mut issues = std::pin::pin!(issues);

        while let Some(issue) = issues.try_next().await? {
            if !aggregator.qualifies(&issue) {
                continue;
            }

            let reactions = fetcher::paginate::<_, Reaction>(
                self.api,
                &self.policy,
                Endpoint::Reactions {
                    repo: repo.clone(),
                    issue_number: issue.number,
                },
            );
            let record = aggregator.aggregate(&issue, reactions).await?;

            // Log the issue URL to make it easier to see if the run is stuck.
            tracing::info!(
                url = %record.url,
                total = record.total_count,
                recent = record.recent_count,
                "Collected issue"
            );

            if collector.push(record).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::test_support::{issues_json, reactions_json, ScriptedApi};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn issues_route(repo: &Repository, page: u32) -> String {
        Endpoint::Issues { repo: repo.clone() }.route(page)
    }

    fn reactions_route(repo: &Repository, number: u64) -> String {
        Endpoint::Reactions {
            repo: repo.clone(),
            issue_number: number,
        }
        .route(1)
    }

    #[tokio::test]
    async fn test_below_threshold_issues_skip_reaction_fetch() {
        let api = ScriptedApi::new();
        let repo = Repository::new("w3c", "csswg-drafts");
        api.push_body(&issues_route(&repo, 1), &issues_json(1..=2, 9));

        let survey = IssueSurvey::new(&api, RateLimitPolicy::default(), SurveyOptions::default());
        let report = survey.run_at(&[repo.clone()], now()).await.unwrap();

        assert!(report.records.is_empty());
        assert_eq!(api.calls(&reactions_route(&repo, 1)), 0);
        assert_eq!(api.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_cap_stops_mid_repository() {
        let api = ScriptedApi::new();
        let repo = Repository::new("w3c", "csswg-drafts");
        let other = Repository::new("whatwg", "html");
        api.push_body(&issues_route(&repo, 1), &issues_json(1..=5, 10));
        for n in 1..=5 {
            api.push_body(
                &reactions_route(&repo, n),
                &reactions_json(now(), &[Duration::days(1)]),
            );
        }

        let options = SurveyOptions {
            max_records: Some(2),
            ..Default::default()
        };
        let survey = IssueSurvey::new(&api, RateLimitPolicy::default(), options);
        let report = survey.run_at(&[repo.clone(), other.clone()], now()).await.unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(api.calls(&reactions_route(&repo, 3)), 0);
        assert_eq!(api.calls(&issues_route(&other, 1)), 0);
    }

    #[tokio::test]
    async fn test_abort_policy_propagates_error() {
        let api = ScriptedApi::new();
        let broken = Repository::new("a", "broken");
        let fine = Repository::new("b", "fine");
        api.push_status(&issues_route(&broken, 1), 500);
        api.push_body(&issues_route(&fine, 1), "[]");

        let survey = IssueSurvey::new(&api, RateLimitPolicy::default(), SurveyOptions::default());
        let result = survey.run_at(&[broken, fine.clone()], now()).await;

        assert!(matches!(
            result,
            Err(SurveyError::Fetch(FetchError::Status { status: 500, .. }))
        ));
        assert_eq!(api.calls(&issues_route(&fine, 1)), 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_window_fails_before_any_request() {
        let api = ScriptedApi::new();
        let repo = Repository::new("w3c", "csswg-drafts");
        api.push_body(&issues_route(&repo, 1), &issues_json(1..=1, 10));

        let options = SurveyOptions {
            aggregation: AggregationConfig {
                recent_reaction_days: u32::MAX,
                ..Default::default()
            },
            on_fetch_error: FetchErrorPolicy::SkipRepository,
            ..Default::default()
        };
        let survey = IssueSurvey::new(&api, RateLimitPolicy::default(), options);
        let result = survey.run_at(&[repo], now()).await;

        assert!(matches!(
            result,
            Err(SurveyError::Config(ConfigError::RecencyWindowOutOfRange(u32::MAX)))
        ));
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_skip_policy_continues_with_next_repository() {
        let api = ScriptedApi::new();
        let broken = Repository::new("a", "broken");
        let fine = Repository::new("b", "fine");
        api.push_body(&issues_route(&broken, 1), &issues_json(1..=1, 12));
        api.push_status(&reactions_route(&broken, 1), 502);
        api.push_body(&issues_route(&fine, 1), &issues_json(7..=7, 11));
        api.push_body(
            &reactions_route(&fine, 7),
            &reactions_json(now(), &[Duration::days(3), Duration::days(120)]),
        );

        let options = SurveyOptions {
            on_fetch_error: FetchErrorPolicy::SkipRepository,
            ..Default::default()
        };
        let survey = IssueSurvey::new(&api, RateLimitPolicy::default(), options);
        let report = survey.run_at(&[broken.clone(), fine], now()).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].repo, broken);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].total_count, 11);
        assert_eq!(report.records[0].recent_count, 1);
    }
}
