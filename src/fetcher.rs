//! Lazy page-by-page traversal of GitHub list endpoints.
//!
//! [`paginate`] turns a page-numbered endpoint into a `Stream` of items. The
//! next page is requested only once the previous one has been drained, so at
//! most one request is in flight. Streams are not restartable: calling
//! `paginate` again starts over from page 1.

use crate::error::FetchError;
use crate::github::GitHubApi;
use crate::ratelimit::RateLimitPolicy;
use crate::types::Repository;
use futures::stream::{self, Stream, TryStreamExt};
use serde::de::DeserializeOwned;

/// Items requested per page. A shorter page is the last one.
pub const PAGE_SIZE: usize = 100;

/// The two list endpoints the survey reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Issues {
        repo: Repository,
    },
    Reactions {
        repo: Repository,
        issue_number: u64,
    },
}

impl Endpoint {
    /// API route for the given 1-based page.
    pub fn route(&self, page: u32) -> String {
        match self {
            Endpoint::Issues { repo } => format!(
                "/repos/{}/{}/issues?per_page={}&page={}",
                repo.owner, repo.name, PAGE_SIZE, page
            ),
            Endpoint::Reactions { repo, issue_number } => format!(
                "/repos/{}/{}/issues/{}/reactions?per_page={}&page={}",
                repo.owner, repo.name, issue_number, PAGE_SIZE, page
            ),
        }
    }
}

/// Fetches and decodes a single page.
pub async fn fetch_page<A, T>(
    api: &A,
    policy: &RateLimitPolicy,
    endpoint: &Endpoint,
    page: u32,
) -> Result<Vec<T>, FetchError>
where
    A: GitHubApi,
    T: DeserializeOwned,
{
    let route = endpoint.route(page);
    let body = policy.execute(api, &route).await?;
    serde_json::from_str(&body).map_err(|source| FetchError::Decode { url: route, source })
}

/// Streams every item of `endpoint`, one page at a time.
///
/// The stream ends after the first page holding fewer than [`PAGE_SIZE`]
/// items. A failed page yields a single `Err` and ends the stream.
pub fn paginate<'a, A, T>(
    api: &'a A,
    policy: &'a RateLimitPolicy,
    endpoint: Endpoint,
) -> impl Stream<Item = Result<T, FetchError>> + 'a
where
    A: GitHubApi,
    T: DeserializeOwned + 'a,
{
    stream::try_unfold(Some(1u32), move |next_page| {
        let endpoint = endpoint.clone();
        async move {
            let Some(page) = next_page else {
                return Ok::<_, FetchError>(None);
            };

            let items: Vec<T> = fetch_page(api, policy, &endpoint, page).await?;
            tracing::debug!(route = %endpoint.route(page), count = items.len(), "Fetched page");

            let next = (items.len() >= PAGE_SIZE).then_some(page + 1);
            Ok(Some((stream::iter(items.into_iter().map(Ok::<T, FetchError>)), next)))
        }
    })
    .try_flatten()
}
