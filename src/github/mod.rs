//! GitHub API access.
//!
//! [`StatsClient`] is the seam the aggregation engine talks through;
//! [`GitHubClient`] implements it over GraphQL and REST.

pub mod client;
pub mod error;
pub mod queries;

pub use client::GitHubClient;
pub use error::ClientError;

use crate::models::{AuthorLines, ContributionsSummary, RepositoryPage};
use async_trait::async_trait;
use std::fmt;

/// A repository listing the engine paginates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoSource {
    /// Repositories the account owns.
    Owned,
    /// Repositories the account contributed to without owning.
    ContributedTo,
}

impl RepoSource {
    /// Processing order. A repository present in both listings is decided
    /// by the first listing that contains it, so owned always wins.
    pub const ORDER: [RepoSource; 2] = [RepoSource::Owned, RepoSource::ContributedTo];
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoSource::Owned => write!(f, "owned"),
            RepoSource::ContributedTo => write!(f, "contributed-to"),
        }
    }
}

/// Result of one statistics request.
///
/// GitHub computes repository statistics lazily: the first request answers
/// 202 and the data shows up on a later call.
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    /// Accepted but not computed yet.
    NotReady,
    /// Rate limited.
    Throttled,
    Failed(ClientError),
}

impl<T> Attempt<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Attempt::Ready(value) => Attempt::Ready(f(value)),
            Attempt::NotReady => Attempt::NotReady,
            Attempt::Throttled => Attempt::Throttled,
            Attempt::Failed(err) => Attempt::Failed(err),
        }
    }
}

/// Remote queries needed to build a [`crate::models::Stats`] record.
#[async_trait]
pub trait StatsClient: Send + Sync {
    /// Fetch one page of a listing. `cursor` is `None` for the first page.
    async fn fetch_repository_page(
        &self,
        login: &str,
        source: RepoSource,
        cursor: Option<&str>,
    ) -> Result<RepositoryPage, ClientError>;

    /// Years in which the account has contributions.
    async fn fetch_contribution_years(&self, login: &str) -> Result<Vec<i32>, ClientError>;

    /// Contribution counters for a single calendar year.
    async fn fetch_contribution_calendar(
        &self,
        login: &str,
        year: i32,
    ) -> Result<ContributionsSummary, ClientError>;

    /// Total traffic views of a repository over the past two weeks.
    async fn fetch_repo_traffic(&self, full_name: &str) -> Attempt<u64>;

    /// Lines added and deleted per contributor of a repository.
    async fn fetch_repo_authorship(&self, full_name: &str) -> Attempt<Vec<AuthorLines>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_listing_comes_first() {
        assert_eq!(RepoSource::ORDER[0], RepoSource::Owned);
        assert_eq!(RepoSource::ORDER[1], RepoSource::ContributedTo);
    }

    #[test]
    fn test_attempt_map() {
        assert!(matches!(Attempt::Ready(2).map(|v| v * 2), Attempt::Ready(4)));
        assert!(matches!(
            Attempt::<u32>::Throttled.map(|v| v * 2),
            Attempt::Throttled
        ));
    }
}
