pub mod aggregator;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod github;
pub mod output;
pub mod ratelimit;
pub mod registry;
pub mod survey;
pub mod types;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use config::AppConfig;
use github::{GitHubApi, GitHubClient};
use ratelimit::RateLimitPolicy;
use survey::{IssueSurvey, SurveyOptions, SurveyReport};

/// Runs a full survey against GitHub and writes the configured outputs.
pub async fn run(config: &AppConfig) -> anyhow::Result<SurveyReport> {
    let client = GitHubClient::new(config.github_token.clone())
        .context("Failed to build GitHub client")?;
    run_with(&client, config).await
}

/// Same as [`run`] against any [`GitHubApi`] implementation.
pub async fn run_with<A: GitHubApi>(api: &A, config: &AppConfig) -> anyhow::Result<SurveyReport> {
    let entries = registry::load_registry(&config.registry_path).await?;
    let repos = registry::repositories(&entries);
    tracing::info!(
        entries = entries.len(),
        repositories = repos.len(),
        "Loaded spec registry"
    );

    let policy = RateLimitPolicy::new(config.rate_limit_max_attempts);
    let survey = IssueSurvey::new(api, policy, SurveyOptions::from_config(config));
    let report = survey.run(&repos).await.context("Survey aborted")?;

    // JSON keeps discovery order; the CSV and the log are ranked.
    output::write_json(&config.output_path, &report.records).await?;
    let ranked = output::rank_by_total(report.records.clone());
    if let Some(csv_path) = &config.csv_output_path {
        output::write_csv(csv_path, &ranked).await?;
    }

    if let Some(top) = ranked.first() {
        tracing::info!(
            top = %output::pretty_reference(&top.url),
            total = top.total_count,
            "Most reacted issue"
        );
    }
    tracing::info!(
        records = ranked.len(),
        skipped = report.skipped.len(),
        output = %config.output_path.display(),
        "Survey complete"
    );

    Ok(report)
}
