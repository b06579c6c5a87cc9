//! Per-issue reaction counting.
//!
//! An issue qualifies when its reaction rollup reaches the threshold. For a
//! qualifying issue every reaction is read, and those created strictly after
//! the cutoff (`now` minus the recency window) count as recent.

use crate::config::AggregationConfig;
use crate::error::{ConfigError, FetchError};
use crate::types::{AggregatedRecord, Issue, Reaction};
use chrono::{DateTime, TimeDelta, Utc};
use futures::{Stream, TryStreamExt};

/// Computes total and recent reaction counts for qualifying issues.
///
/// The cutoff is fixed when the aggregator is built, so every issue in a run
/// is measured against the same instant.
#[derive(Clone, Debug)]
pub struct ReactionAggregator {
    min_reaction_count: u64,
    cutoff: DateTime<Utc>,
}

impl ReactionAggregator {
    /// # Arguments
    /// * `config` - Threshold and recency window.
    /// * `now` - Reference point the recency window is measured back from.
    ///
    /// Fails when the window reaches further back than chrono can represent.
    pub fn new(config: &AggregationConfig, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let days = config.recent_reaction_days;
        let cutoff = TimeDelta::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or(ConfigError::RecencyWindowOutOfRange(days))?;

        Ok(Self {
            min_reaction_count: config.min_reaction_count,
            cutoff,
        })
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Whether the issue has enough reactions to be aggregated at all.
    pub fn qualifies(&self, issue: &Issue) -> bool {
        issue.total_reaction_count() >= self.min_reaction_count
    }

    /// Strictly after the cutoff. A reaction exactly at the cutoff is not recent.
    pub fn is_recent(&self, reaction: &Reaction) -> bool {
        reaction.created_at > self.cutoff
    }

    /// Drains `reactions` and builds the issue's record.
    ///
    /// The whole stream is consumed even when every remaining reaction is old.
    pub async fn aggregate<S>(
        &self,
        issue: &Issue,
        reactions: S,
    ) -> Result<AggregatedRecord, FetchError>
    where
        S: Stream<Item = Result<Reaction, FetchError>>,
    {
        let recent = reactions
            .try_fold(0u64, |recent, reaction| async move {
                Ok(if self.is_recent(&reaction) { recent + 1 } else { recent })
            })
            .await?;

        let total_count = issue.total_reaction_count();

        Ok(AggregatedRecord {
            total_count,
            recent_count: recent.min(total_count),
            url: issue.html_url.clone(),
            title: issue.title.clone(),
        })
    }
}
