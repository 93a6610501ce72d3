//! The aggregation engine.
//!
//! A run has three phases:
//!
//! 1. Walk every listing page by page. Each page is merged into the record on
//!    the calling task, in order, before the next page is requested. Included
//!    repositories are handed to enrichment tasks.
//! 2. Enrichment tasks wait on a shared semaphore, query traffic and
//!    authorship through [`with_retry`], and send results to the reducers.
//! 3. After every task has finished the result channels are closed, the
//!    reducers are joined, and their totals are written into the record.
//!
//! The merge loop is the only writer of the repository and language maps;
//! each reducer is the only writer of its own total.

use super::reducer::{spawn_line_reducer, spawn_view_reducer, RESULT_BUFFER};
use super::retry::{with_retry, RetryError, RetryPolicy};
use super::{EngineConfig, StatsError};
use crate::github::{RepoSource, StatsClient};
use crate::models::{
    AuthorLines, ContributionsSummary, LineChanges, MergeStatus, RepositoryPage, Stats,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Senders handed to enrichment tasks. `None` disables that enrichment.
#[derive(Debug, Clone)]
struct ResultChannels {
    views: Option<mpsc::Sender<u64>>,
    lines: Option<mpsc::Sender<LineChanges>>,
}

impl ResultChannels {
    fn is_empty(&self) -> bool {
        self.views.is_none() && self.lines.is_none()
    }
}

/// Builds a [`Stats`] record for one account.
pub struct Aggregator<C> {
    client: Arc<C>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl<C: StatsClient + 'static> Aggregator<C> {
    /// Create an engine, validating the configuration once.
    pub fn new(client: Arc<C>, config: EngineConfig) -> Result<Self, StatsError> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort the run when `cancel` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the aggregation to completion.
    pub async fn collect(&self) -> Result<Stats, StatsError> {
        let mut stats = Stats::new(self.config.login.clone());

        let (view_tx, view_rx) = mpsc::channel(RESULT_BUFFER);
        let (line_tx, line_rx) = mpsc::channel(RESULT_BUFFER);
        let view_reducer = spawn_view_reducer(view_rx);
        let line_reducer = spawn_line_reducer(line_rx);

        let channels = ResultChannels {
            views: (!self.config.ignore_repo_views).then_some(view_tx),
            lines: (!self.config.ignore_lines_changed).then_some(line_tx),
        };
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();

        for source in self.config.sources() {
            self.merge_listing(source, &mut stats, &channels, &semaphore, &mut tasks)
                .await?;
        }

        stats.compute_proportions();
        stats.contributions = self.total_contributions().await?;

        info!(
            "Merged {} repositories; waiting for {} enrichment tasks",
            stats.repos_count(),
            tasks.len()
        );
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Enrichment task failed: {}", e);
            }
        }
        drop(channels);

        let views = view_reducer.await?;
        let lines = line_reducer.await?;

        if self.cancel.is_cancelled() {
            return Err(StatsError::Cancelled);
        }

        if !self.config.ignore_repo_views {
            stats.views = Some(views);
        }
        if !self.config.ignore_lines_changed {
            stats.line_changes = Some(lines);
        }

        Ok(stats)
    }

    /// Walk one listing, merging every page and scheduling enrichment.
    async fn merge_listing(
        &self,
        source: RepoSource,
        stats: &mut Stats,
        channels: &ResultChannels,
        semaphore: &Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) -> Result<(), StatsError> {
        let mut cursor: Option<String> = None;
        let mut page_number = 0usize;

        loop {
            let page: RepositoryPage = self
                .cancellable(self.client.fetch_repository_page(
                    &self.config.login,
                    source,
                    cursor.as_deref(),
                ))
                .await?
                .map_err(|error| StatsError::Listing {
                    listing: source,
                    error,
                })?;
            page_number += 1;
            debug!(
                "Page {} of {} repositories: {} entries",
                page_number,
                source,
                page.facts.len()
            );

            let mut included = Vec::new();
            for fact in &page.facts {
                match stats.merge_repository(fact, &self.config.filter) {
                    MergeStatus::Included => included.push(fact.name_with_owner.clone()),
                    MergeStatus::Duplicate => {
                        debug!("{} already recorded, skipping", fact.name_with_owner)
                    }
                    MergeStatus::NotOwned => {
                        debug!("{} is not owned by an included owner", fact.name_with_owner)
                    }
                    MergeStatus::Excluded(reason) => {
                        debug!("{} ignored: {}", fact.name_with_owner, reason)
                    }
                }
            }

            for repo in included {
                self.spawn_enrichment(repo, channels, semaphore, tasks);
            }

            if !page.has_next_page {
                return Ok(());
            }
            match page.end_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    warn!(
                        "{} listing reported another page without a cursor; stopping",
                        source
                    );
                    return Ok(());
                }
            }
        }
    }

    fn spawn_enrichment(
        &self,
        repo: String,
        channels: &ResultChannels,
        semaphore: &Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        if channels.is_empty() {
            return;
        }

        let client = Arc::clone(&self.client);
        let channels = channels.clone();
        let semaphore = Arc::clone(semaphore);
        let cancel = self.cancel.clone();
        let retry = self.config.retry;
        let login = self.config.login.clone();

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Semaphore closed; skipping enrichment of {}", repo);
                    return;
                }
            };
            enrich_repository(client.as_ref(), &repo, &login, &channels, &retry, &cancel).await;
        });
    }

    /// Sum contribution counters over every contribution year.
    async fn total_contributions(&self) -> Result<ContributionsSummary, StatsError> {
        let login = self.config.login.as_str();

        let years = self
            .cancellable(self.client.fetch_contribution_years(login))
            .await?
            .map_err(StatsError::Contributions)?;

        let per_year = self
            .cancellable(futures::future::try_join_all(
                years
                    .iter()
                    .map(|&year| self.client.fetch_contribution_calendar(login, year)),
            ))
            .await?
            .map_err(StatsError::Contributions)?;

        let mut total = ContributionsSummary::default();
        for year in per_year {
            total += year;
        }
        debug!(
            "{} contributions across {} years",
            total.total_contributions,
            years.len()
        );
        Ok(total)
    }

    /// Await `fut` unless the run is cancelled first.
    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Result<T, StatsError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StatsError::Cancelled),
            value = fut => Ok(value),
        }
    }
}

/// Lines the account itself authored.
fn own_lines(authors: &[AuthorLines], login: &str) -> LineChanges {
    authors
        .iter()
        .filter(|author| author.login.eq_ignore_ascii_case(login))
        .fold(LineChanges::default(), |mut total, author| {
            total.additions += author.additions;
            total.deletions += author.deletions;
            total
        })
}

fn log_enrichment_failure(kind: &str, repo: &str, err: &RetryError) {
    match err {
        RetryError::Cancelled => debug!("{} for {} cancelled", kind, repo),
        _ => warn!("Skipping {} for {}: {}", kind, repo, err),
    }
}

/// Query the enabled statistics of one repository and forward the results.
async fn enrich_repository<C: StatsClient + ?Sized>(
    client: &C,
    repo: &str,
    login: &str,
    channels: &ResultChannels,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) {
    if let Some(tx) = &channels.views {
        match with_retry(retry, cancel, repo, || client.fetch_repo_traffic(repo)).await {
            Ok(count) => {
                if tx.send(count).await.is_err() {
                    debug!("View reducer closed before {} reported", repo);
                }
            }
            Err(e) => log_enrichment_failure("views", repo, &e),
        }
    }

    if let Some(tx) = &channels.lines {
        match with_retry(retry, cancel, repo, || client.fetch_repo_authorship(repo)).await {
            Ok(authors) => {
                if tx.send(own_lines(&authors, login)).await.is_err() {
                    debug!("Line reducer closed before {} reported", repo);
                }
            }
            Err(e) => log_enrichment_failure("line changes", repo, &e),
        }
    }
}
