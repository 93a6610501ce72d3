//! HTTP client for the GitHub GraphQL and REST APIs.

use super::error::ClientError;
use super::queries::{
    self, ContributionCalendarData, ContributionYearsData, ContributorStats, GraphQlRequest,
    GraphQlResponse, RepositoryListing, TrafficViews, UserData,
};
use super::{Attempt, RepoSource, StatsClient};
use crate::models::{AuthorLines, ContributionsSummary, RepositoryPage};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("ghstat/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How a REST status code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Body,
    Empty,
    NotReady,
    Throttled,
    Error,
}

fn classify(status: StatusCode, rate_limit_remaining: Option<&str>) -> StatusClass {
    match status {
        StatusCode::ACCEPTED => StatusClass::NotReady,
        StatusCode::NO_CONTENT => StatusClass::Empty,
        StatusCode::TOO_MANY_REQUESTS => StatusClass::Throttled,
        StatusCode::FORBIDDEN if rate_limit_remaining == Some("0") => StatusClass::Throttled,
        s if s.is_success() => StatusClass::Body,
        _ => StatusClass::Error,
    }
}

/// GitHub API client authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    /// Create a client for an API root (github.com, GitHub Enterprise, test servers).
    pub fn with_api_url(
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Check the token against `GET /user`.
    pub async fn is_token_valid(&self) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.rest::<Value>("user").await {
            Attempt::Ready(_) => true,
            other => {
                debug!("Token check failed: {:?}", other);
                false
            }
        }
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, ClientError> {
        let url = format!("{}/graphql", self.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::status(status.as_u16(), &body));
        }

        let parsed: GraphQlResponse<T> = serde_json::from_str(&body)?;
        if let Some(err) = parsed.errors.first() {
            return Err(ClientError::GraphQl(err.message.clone()));
        }
        parsed
            .data
            .ok_or_else(|| ClientError::GraphQl("response carried no data".to_string()))
    }

    async fn user_query<T: DeserializeOwned>(
        &self,
        login: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ClientError> {
        let data: UserData<T> = self.graphql(query, variables).await?;
        data.user
            .ok_or_else(|| ClientError::UserNotFound(login.to_string()))
    }

    async fn rest<T: DeserializeOwned + Default>(&self, path: &str) -> Attempt<T> {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        debug!("GET {}", url);

        let response = match self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(e.into()),
        };

        let status = response.status();
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match classify(status, remaining.as_deref()) {
            StatusClass::NotReady => Attempt::NotReady,
            StatusClass::Throttled => Attempt::Throttled,
            StatusClass::Empty => Attempt::Ready(T::default()),
            StatusClass::Body => match response.text().await {
                Ok(body) => match serde_json::from_str(&body) {
                    Ok(value) => Attempt::Ready(value),
                    Err(e) => Attempt::Failed(e.into()),
                },
                Err(e) => Attempt::Failed(e.into()),
            },
            StatusClass::Error => {
                let body = response.text().await.unwrap_or_default();
                Attempt::Failed(ClientError::status(status.as_u16(), &body))
            }
        }
    }
}

#[async_trait]
impl StatsClient for GitHubClient {
    async fn fetch_repository_page(
        &self,
        login: &str,
        source: RepoSource,
        cursor: Option<&str>,
    ) -> Result<RepositoryPage, ClientError> {
        let query = match source {
            RepoSource::Owned => queries::with_repo_fields(queries::OWNED_REPOSITORIES),
            RepoSource::ContributedTo => {
                queries::with_repo_fields(queries::CONTRIBUTED_REPOSITORIES)
            }
        };
        let variables = serde_json::json!({ "login": login, "after": cursor });

        debug!("Fetching {} repositories after {:?}", source, cursor);
        let listing: RepositoryListing = self.user_query(login, &query, variables).await?;

        let connection = match source {
            RepoSource::Owned => listing.repositories,
            RepoSource::ContributedTo => listing.repositories_contributed_to,
        };
        connection
            .map(Into::into)
            .ok_or_else(|| ClientError::GraphQl(format!("missing {} repository listing", source)))
    }

    async fn fetch_contribution_years(&self, login: &str) -> Result<Vec<i32>, ClientError> {
        let variables = serde_json::json!({ "login": login });
        let data: ContributionYearsData = self
            .user_query(login, queries::CONTRIBUTION_YEARS, variables)
            .await?;
        Ok(data.contributions_collection.contribution_years)
    }

    async fn fetch_contribution_calendar(
        &self,
        login: &str,
        year: i32,
    ) -> Result<ContributionsSummary, ClientError> {
        let data: ContributionCalendarData = self
            .user_query(
                login,
                queries::CONTRIBUTION_CALENDAR,
                queries::year_variables(login, year),
            )
            .await?;
        Ok(data.contributions_collection.into())
    }

    async fn fetch_repo_traffic(&self, full_name: &str) -> Attempt<u64> {
        self.rest::<TrafficViews>(&format!("repos/{}/traffic/views", full_name))
            .await
            .map(|traffic| traffic.total())
    }

    async fn fetch_repo_authorship(&self, full_name: &str) -> Attempt<Vec<AuthorLines>> {
        self.rest::<Vec<ContributorStats>>(&format!("repos/{}/stats/contributors", full_name))
            .await
            .map(|contributors| {
                contributors
                    .into_iter()
                    .filter_map(ContributorStats::into_author_lines)
                    .collect()
            })
    }
}
