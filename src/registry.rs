//! Spec registry input and repository resolution.
//!
//! The registry is a JSON array of spec entries in the `browser-specs` layout.
//! Each entry may name its source repository under `nightly.repository`. Only
//! `https://github.com/{owner}/{name}` URLs are kept. Anything else is dropped
//! without an error.

use crate::error::{MalformedRepositoryReference, RegistryError};
use crate::types::Repository;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// Host every surveyed repository must live on.
pub const GITHUB_HOST: &str = "github.com";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NightlyInfo {
    pub repository: Option<String>,
}

/// One registry entry. Fields other than the repository URL are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistryEntry {
    #[serde(default)]
    pub nightly: Option<NightlyInfo>,
}

impl RegistryEntry {
    pub fn with_repository(url: impl Into<String>) -> Self {
        Self {
            nightly: Some(NightlyInfo {
                repository: Some(url.into()),
            }),
        }
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.nightly.as_ref()?.repository.as_deref()
    }
}

impl Repository {
    /// Parses a `https://github.com/{owner}/{name}` URL.
    ///
    /// Empty path segments are ignored, so a trailing slash is accepted.
    pub fn from_url(raw: &str) -> Result<Self, MalformedRepositoryReference> {
        let url = Url::parse(raw)?;

        if url.host_str() != Some(GITHUB_HOST) {
            return Err(MalformedRepositoryReference::OffHost(
                url.host_str().map(str::to_owned),
            ));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [owner, name] => Ok(Repository::new(*owner, *name)),
            other => Err(MalformedRepositoryReference::PathShape(other.len())),
        }
    }

    /// Canonical `https://github.com/{owner}/{name}` URL.
    pub fn url(&self) -> String {
        format!("https://{GITHUB_HOST}/{}/{}", self.owner, self.name)
    }
}

/// Reads and parses the registry file.
pub async fn load_registry(path: &Path) -> Result<Vec<RegistryEntry>, RegistryError> {
    let display = path.display().to_string();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RegistryError::Io {
            path: display.clone(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
        path: display,
        source,
    })
}

/// Resolves registry entries to the unique repositories to survey, ordered
/// by their canonical URL.
pub fn repositories(entries: &[RegistryEntry]) -> Vec<Repository> {
    let repos: BTreeMap<String, Repository> = entries
        .iter()
        .filter_map(RegistryEntry::repository_url)
        .filter_map(|raw| match Repository::from_url(raw) {
            Ok(repo) => Some((repo.url(), repo)),
            Err(e) => {
                tracing::debug!(url = raw, "Skipping repository reference: {}", e);
                None
            }
        })
        .collect();

    repos.into_values().collect()
}
