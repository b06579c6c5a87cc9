//! Error types for the survey pipeline.
//!
//! Library code returns these `thiserror` enums; `main` wraps them in `anyhow`.

use crate::ratelimit::RateLimitKind;
use thiserror::Error;

/// A remote read that could not be completed.
///
/// Any `FetchError` that escapes the paginated fetcher is fatal to the current
/// repository, and to the whole run unless the run is configured to skip
/// failing repositories.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport or client failure reported by octocrab.
    #[error("GitHub request failed: {0}")]
    GitHub(#[from] octocrab::Error),

    /// A rate limit that the policy refused to (or could no longer) retry.
    #[error("{kind} rate limit hit for GET {url} after {attempts} attempt(s)")]
    RateLimited {
        kind: RateLimitKind,
        url: String,
        attempts: u32,
    },

    /// Non-success status that is not a rate limit signal.
    #[error("GET {url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The response body did not match the expected item shape.
    #[error("unexpected response body from GET {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A configuration value that cannot be used for a run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("recency window of {0} days reaches outside the supported date range")]
    RecencyWindowOutOfRange(u32),
}

/// Why a survey run stopped without a report.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Why a registry repository URL was not accepted.
///
/// These are never propagated. Entries that fail to parse are dropped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MalformedRepositoryReference {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("host {0:?} is not github.com")]
    OffHost(Option<String>),

    #[error("path has {0} segment(s), expected owner/name")]
    PathShape(usize),
}

/// Failure to read the spec registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read registry {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry {path} is not a JSON array of entries")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to write one of the output files.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize records")]
    Serialize(#[from] serde_json::Error),
}
