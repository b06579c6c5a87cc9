//! Data types shared across the pipeline.
//!
//! `Issue` and `Reaction` mirror the subset of the GitHub REST payloads the
//! survey reads; `AggregatedRecord` is what ends up in the output files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A GitHub repository identified by owner and name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    /// The owner of the repository (e.g., "w3c").
    pub owner: String,
    /// The name of the repository (e.g., "csswg-drafts").
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Reaction rollup attached to every issue in the REST listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ReactionRollup {
    pub total_count: u64,
}

/// An issue as returned by `GET /repos/{owner}/{repo}/issues`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub html_url: String,
    pub title: String,
    #[serde(default)]
    pub reactions: ReactionRollup,
}

impl Issue {
    pub fn total_reaction_count(&self) -> u64 {
        self.reactions.total_count
    }
}

/// A single reaction. Only the creation time matters here.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Reaction {
    pub created_at: DateTime<Utc>,
}

/// Per-issue output unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    /// Total reactions on the issue.
    pub total_count: u64,
    /// Reactions created inside the recency window. Never exceeds `total_count`.
    pub recent_count: u64,
    pub url: String,
    pub title: String,
}
