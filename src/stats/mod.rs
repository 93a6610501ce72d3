//! Aggregation of repository listings and statistics into [`Stats`].
//!
//! # Module Structure
//!
//! - [`filter`] - owner, repository and language exclusion rules
//! - [`merge`] - first-writer-wins merge of repository facts
//! - [`retry`] - retry loop for lazily computed statistics endpoints
//! - [`reducer`] - fold tasks for view and line-change totals
//! - [`engine`] - pagination, bounded fan-out and the join barrier
//!
//! [`Stats`]: crate::models::Stats

pub mod engine;
pub mod filter;
pub mod merge;
pub mod reducer;
pub mod retry;

pub use engine::Aggregator;
pub use filter::Filter;

use crate::github::{ClientError, RepoSource};
use retry::RetryPolicy;
use thiserror::Error;

/// Default number of enrichment requests allowed in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Upper bound accepted for [`EngineConfig::concurrency`].
pub const MAX_CONCURRENCY: usize = 64;

/// Errors that abort an aggregation run.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to list {listing} repositories: {error}")]
    Listing {
        listing: RepoSource,
        #[source]
        error: ClientError,
    },

    #[error("Failed to query contributions: {0}")]
    Contributions(#[source] ClientError),

    #[error("Aggregation cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Everything the engine needs to know about one run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Account whose activity is aggregated.
    pub login: String,
    pub filter: Filter,
    /// Skip the contributed-to listing entirely.
    pub ignore_contributed_to_repos: bool,
    /// Skip per-repository authorship queries.
    pub ignore_lines_changed: bool,
    /// Skip per-repository traffic queries.
    pub ignore_repo_views: bool,
    /// Enrichment requests allowed in flight at once.
    pub concurrency: usize,
    /// Retry budget and delays for lazily computed statistics.
    pub retry: RetryPolicy,
}

impl EngineConfig {
    /// Configuration with every listing and enrichment enabled.
    pub fn new(login: impl Into<String>, filter: Filter) -> Self {
        Self {
            login: login.into(),
            filter,
            ignore_contributed_to_repos: false,
            ignore_lines_changed: false,
            ignore_repo_views: false,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.login.trim().is_empty() {
            return Err(StatsError::InvalidConfig(
                "account login must not be empty".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(StatsError::InvalidConfig(
                "retry budget must allow at least one attempt".to_string(),
            ));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(StatsError::InvalidConfig(format!(
                "concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }
        Ok(())
    }

    /// Listings to walk, in processing order.
    pub fn sources(&self) -> Vec<RepoSource> {
        RepoSource::ORDER
            .into_iter()
            .filter(|source| {
                !(self.ignore_contributed_to_repos && *source == RepoSource::ContributedTo)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_login() {
        let config = EngineConfig::new("  ", Filter::new(["me"]));
        assert!(matches!(
            config.validate(),
            Err(StatsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let mut config = EngineConfig::new("me", Filter::new(["me"]));
        assert!(config.validate().is_ok());

        config.concurrency = 0;
        assert!(config.validate().is_err());

        config.concurrency = MAX_CONCURRENCY + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_retry_budget() {
        let mut config = EngineConfig::new("me", Filter::new(["me"]));
        assert_eq!(config.retry, RetryPolicy::default());

        config.retry.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(StatsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_sources_order() {
        let mut config = EngineConfig::new("me", Filter::new(["me"]));
        assert_eq!(
            config.sources(),
            vec![RepoSource::Owned, RepoSource::ContributedTo]
        );

        config.ignore_contributed_to_repos = true;
        assert_eq!(config.sources(), vec![RepoSource::Owned]);
    }

    #[test]
    fn test_listing_error_message() {
        let err = StatsError::Listing {
            listing: RepoSource::ContributedTo,
            error: ClientError::GraphQl("boom".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to list contributed-to repositories: GraphQL error: boom"
        );
    }
}
