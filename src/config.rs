//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs the reaction threshold, the recency
//! window, rate limit retries, output locations and how fetch failures are treated.

use crate::ratelimit::DEFAULT_MAX_ATTEMPTS;
use serde::Deserialize;
use std::path::PathBuf;

/// Thresholds used by the reaction aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationConfig {
    /// Minimum number of reactions for an issue to be considered.
    pub min_reaction_count: u64,
    /// How many days back a reaction still counts as recent.
    pub recent_reaction_days: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_reaction_count: default_min_reaction_count(),
            recent_reaction_days: default_recent_reaction_days(),
        }
    }
}

/// What a run does when a repository cannot be fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorPolicy {
    /// Stop the run and fail.
    #[default]
    Abort,
    /// Log the failure, keep records collected so far, move on to the next repository.
    SkipRepository,
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Path to the spec registry JSON (a `browser-specs` style `index.json`).
    pub registry_path: PathBuf,

    /// Optional GitHub Personal Access Token for higher rate limits.
    pub github_token: Option<String>,

    #[serde(default = "default_min_reaction_count")]
    pub min_reaction_count: u64,

    #[serde(default = "default_recent_reaction_days")]
    pub recent_reaction_days: u32,

    /// Stop after this many records have been collected.
    pub max_records: Option<usize>,

    /// Attempts allowed for a call hitting the primary rate limit.
    #[serde(default = "default_rate_limit_max_attempts")]
    pub rate_limit_max_attempts: u32,

    #[serde(default)]
    pub on_fetch_error: FetchErrorPolicy,

    /// Where the JSON records are written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Optional `count,url` CSV output.
    pub csv_output_path: Option<PathBuf>,
}

fn default_min_reaction_count() -> u64 {
    10
}

fn default_recent_reaction_days() -> u32 {
    90
}

fn default_rate_limit_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_output_path() -> PathBuf {
    PathBuf::from("issues.json")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn aggregation(&self) -> AggregationConfig {
        AggregationConfig {
            min_reaction_count: self.min_reaction_count,
            recent_reaction_days: self.recent_reaction_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 9] = [
        "REGISTRY_PATH",
        "GITHUB_TOKEN",
        "MIN_REACTION_COUNT",
        "RECENT_REACTION_DAYS",
        "MAX_RECORDS",
        "RATE_LIMIT_MAX_ATTEMPTS",
        "ON_FETCH_ERROR",
        "OUTPUT_PATH",
        "CSV_OUTPUT_PATH",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_vars();
        env::set_var("REGISTRY_PATH", "specs/index.json");
        env::set_var("MIN_REACTION_COUNT", "25");
        env::set_var("RECENT_REACTION_DAYS", "30");
        env::set_var("MAX_RECORDS", "10");
        env::set_var("RATE_LIMIT_MAX_ATTEMPTS", "5");
        env::set_var("ON_FETCH_ERROR", "skip-repository");
        env::set_var("CSV_OUTPUT_PATH", "issues.csv");

        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.registry_path, PathBuf::from("specs/index.json"));
        assert_eq!(config.min_reaction_count, 25);
        assert_eq!(config.recent_reaction_days, 30);
        assert_eq!(config.max_records, Some(10));
        assert_eq!(config.rate_limit_max_attempts, 5);
        assert_eq!(config.on_fetch_error, FetchErrorPolicy::SkipRepository);
        assert_eq!(config.output_path, PathBuf::from("issues.json"));
        assert_eq!(config.csv_output_path, Some(PathBuf::from("issues.csv")));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_vars();
        env::set_var("REGISTRY_PATH", "index.json");

        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.aggregation(), AggregationConfig::default());
        assert_eq!(config.aggregation().min_reaction_count, 10);
        assert_eq!(config.aggregation().recent_reaction_days, 90);
        assert_eq!(config.max_records, None);
        assert_eq!(config.rate_limit_max_attempts, 3);
        assert_eq!(config.on_fetch_error, FetchErrorPolicy::Abort);
        assert!(config.github_token.is_none());

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_missing_vars() {
        // Ensure a var is missing
        clear_vars();
        let result = AppConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_config_rejects_negative_or_oversized_window() {
        for days in ["-5", "4294967296"] {
            clear_vars();
            env::set_var("REGISTRY_PATH", "index.json");
            env::set_var("RECENT_REACTION_DAYS", days);

            assert!(AppConfig::from_env().is_err(), "accepted {days}");
        }

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_rejects_unknown_fetch_error_policy() {
        clear_vars();
        env::set_var("REGISTRY_PATH", "index.json");
        env::set_var("ON_FETCH_ERROR", "retry-forever");

        assert!(AppConfig::from_env().is_err());

        clear_vars();
    }
}
