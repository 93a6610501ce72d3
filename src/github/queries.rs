//! GraphQL documents and response shapes for the GitHub API.
//!
//! Logins and cursors are always passed as variables, never spliced into
//! the query text.

use crate::models::{AuthorLines, ContributionsSummary, LanguageEdge, RepositoryFact, RepositoryPage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Repositories owned by the user. Forks are filtered out by the API.
pub const OWNED_REPOSITORIES: &str = r#"
query($login: String!, $after: String) {
  user(login: $login) {
    repositories(
      first: 100,
      orderBy: {field: UPDATED_AT, direction: DESC},
      isFork: false,
      after: $after
    ) {
      pageInfo { hasNextPage endCursor }
      nodes { ...RepoFields }
    }
  }
}
"#;

/// Repositories the user contributed to but does not own.
pub const CONTRIBUTED_REPOSITORIES: &str = r#"
query($login: String!, $after: String) {
  user(login: $login) {
    repositoriesContributedTo(
      first: 100,
      includeUserRepositories: false,
      orderBy: {field: UPDATED_AT, direction: DESC},
      contributionTypes: [COMMIT, PULL_REQUEST, REPOSITORY, PULL_REQUEST_REVIEW],
      after: $after
    ) {
      pageInfo { hasNextPage endCursor }
      nodes { ...RepoFields }
    }
  }
}
"#;

const REPO_FIELDS: &str = r#"
fragment RepoFields on Repository {
  nameWithOwner
  stargazers { totalCount }
  forkCount
  isFork
  isArchived
  isPrivate
  languages(first: 10, orderBy: {field: SIZE, direction: DESC}) {
    edges {
      size
      node { name color }
    }
  }
}
"#;

pub const CONTRIBUTION_YEARS: &str = r#"
query($login: String!) {
  user(login: $login) {
    contributionsCollection { contributionYears }
  }
}
"#;

pub const CONTRIBUTION_CALENDAR: &str = r#"
query($login: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $login) {
    contributionsCollection(from: $from, to: $to) {
      totalCommitContributions
      totalIssueContributions
      totalPullRequestContributions
      totalPullRequestReviewContributions
      contributionCalendar { totalContributions }
    }
  }
}
"#;

/// Append the shared repository fragment to a listing query.
pub fn with_repo_fields(query: &str) -> String {
    format!("{query}{REPO_FIELDS}")
}

/// Variables selecting one calendar year of contributions.
pub fn year_variables(login: &str, year: i32) -> Value {
    serde_json::json!({
        "login": login,
        "from": format!("{year}-01-01T00:00:00Z"),
        "to": format!("{}-01-01T00:00:00Z", year + 1),
    })
}

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// `{ "user": ... }` wrapper every query returns.
#[derive(Debug, Deserialize)]
pub struct UserData<T> {
    pub user: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryListing {
    pub repositories: Option<RepoConnection>,
    pub repositories_contributed_to: Option<RepoConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<RepoNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoNode {
    pub name_with_owner: String,
    pub stargazers: TotalCount,
    pub fork_count: u64,
    pub is_fork: bool,
    pub is_archived: bool,
    pub is_private: bool,
    pub languages: Option<LanguageConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct LanguageConnection {
    #[serde(default)]
    pub edges: Vec<LanguageEdgeNode>,
}

#[derive(Debug, Deserialize)]
pub struct LanguageEdgeNode {
    pub size: u64,
    pub node: LanguageNode,
}

#[derive(Debug, Deserialize)]
pub struct LanguageNode {
    pub name: String,
    pub color: Option<String>,
}

impl From<RepoNode> for RepositoryFact {
    fn from(node: RepoNode) -> Self {
        let languages = node
            .languages
            .map(|conn| {
                conn.edges
                    .into_iter()
                    .map(|edge| LanguageEdge {
                        name: edge.node.name,
                        size: edge.size,
                        color: edge.node.color,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name_with_owner: node.name_with_owner,
            fork_count: node.fork_count,
            stargazers: node.stargazers.total_count,
            is_fork: node.is_fork,
            is_archived: node.is_archived,
            is_private: node.is_private,
            languages,
        }
    }
}

impl From<RepoConnection> for RepositoryPage {
    fn from(conn: RepoConnection) -> Self {
        Self {
            facts: conn.nodes.into_iter().flatten().map(Into::into).collect(),
            end_cursor: conn.page_info.end_cursor,
            has_next_page: conn.page_info.has_next_page,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionYearsData {
    pub contributions_collection: ContributionYears,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionYears {
    #[serde(default)]
    pub contribution_years: Vec<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendarData {
    pub contributions_collection: YearCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCollection {
    pub total_commit_contributions: u64,
    pub total_issue_contributions: u64,
    pub total_pull_request_contributions: u64,
    pub total_pull_request_review_contributions: u64,
    pub contribution_calendar: CalendarTotal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTotal {
    pub total_contributions: u64,
}

impl From<YearCollection> for ContributionsSummary {
    fn from(year: YearCollection) -> Self {
        Self {
            total_contributions: year.contribution_calendar.total_contributions,
            total_commit_contributions: year.total_commit_contributions,
            total_issue_contributions: year.total_issue_contributions,
            total_pull_request_contributions: year.total_pull_request_contributions,
            total_pull_request_review_contributions: year.total_pull_request_review_contributions,
        }
    }
}

/// `GET /repos/{repo}/traffic/views`
#[derive(Debug, Default, Deserialize)]
pub struct TrafficViews {
    #[serde(default)]
    pub views: Vec<TrafficDay>,
}

#[derive(Debug, Deserialize)]
pub struct TrafficDay {
    pub count: u64,
}

impl TrafficViews {
    pub fn total(&self) -> u64 {
        self.views.iter().map(|day| day.count).sum()
    }
}

/// One element of `GET /repos/{repo}/stats/contributors`.
#[derive(Debug, Deserialize)]
pub struct ContributorStats {
    pub author: Option<Author>,
    #[serde(default)]
    pub weeks: Vec<ContributorWeek>,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct ContributorWeek {
    #[serde(default)]
    pub a: u64,
    #[serde(default)]
    pub d: u64,
}

impl ContributorStats {
    /// Sum the weekly buckets. Deleted accounts have no author and are dropped.
    pub fn into_author_lines(self) -> Option<AuthorLines> {
        let login = self.author?.login;
        let (additions, deletions) = self
            .weeks
            .iter()
            .fold((0, 0), |(a, d), week| (a + week.a, d + week.d));
        Some(AuthorLines {
            login,
            additions,
            deletions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_repository_listing() {
        let body = r##"{
            "data": {
                "user": {
                    "repositories": {
                        "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29y" },
                        "nodes": [
                            {
                                "nameWithOwner": "me/tool",
                                "stargazers": { "totalCount": 12 },
                                "forkCount": 3,
                                "isFork": false,
                                "isArchived": true,
                                "isPrivate": false,
                                "languages": {
                                    "edges": [
                                        { "size": 900, "node": { "name": "Rust", "color": "#dea584" } },
                                        { "size": 100, "node": { "name": "Shell", "color": null } }
                                    ]
                                }
                            },
                            null
                        ]
                    }
                }
            }
        }"##;

        let resp: GraphQlResponse<UserData<RepositoryListing>> =
            serde_json::from_str(body).unwrap();
        let listing = resp.data.unwrap().user.unwrap();
        let page: RepositoryPage = listing.repositories.unwrap().into();

        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("Y3Vyc29y"));
        assert_eq!(page.facts.len(), 1);

        let fact = &page.facts[0];
        assert_eq!(fact.name_with_owner, "me/tool");
        assert_eq!(fact.stargazers, 12);
        assert_eq!(fact.fork_count, 3);
        assert!(fact.is_archived);
        assert_eq!(fact.languages[0].name, "Rust");
        assert_eq!(fact.languages[0].color.as_deref(), Some("#dea584"));
        assert_eq!(fact.languages[1].color, None);
    }

    #[test]
    fn test_decode_graphql_errors() {
        let body = r#"{ "data": null, "errors": [ { "message": "Bad credentials" } ] }"#;
        let resp: GraphQlResponse<UserData<ContributionYearsData>> =
            serde_json::from_str(body).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors[0].message, "Bad credentials");
    }

    #[test]
    fn test_year_collection_into_summary() {
        let body = r#"{
            "totalCommitContributions": 40,
            "totalIssueContributions": 2,
            "totalPullRequestContributions": 7,
            "totalPullRequestReviewContributions": 5,
            "contributionCalendar": { "totalContributions": 54 }
        }"#;
        let year: YearCollection = serde_json::from_str(body).unwrap();
        let summary = ContributionsSummary::from(year);
        assert_eq!(summary.total_contributions, 54);
        assert_eq!(summary.total_commit_contributions, 40);
        assert_eq!(summary.total_pull_request_review_contributions, 5);
    }

    #[test]
    fn test_year_variables() {
        let vars = year_variables("me", 2023);
        assert_eq!(vars["from"], "2023-01-01T00:00:00Z");
        assert_eq!(vars["to"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_traffic_total() {
        let traffic: TrafficViews = serde_json::from_str(
            r#"{ "count": 9, "uniques": 2, "views": [
                { "timestamp": "2024-01-01T00:00:00Z", "count": 4, "uniques": 1 },
                { "timestamp": "2024-01-02T00:00:00Z", "count": 5, "uniques": 1 }
            ] }"#,
        )
        .unwrap();
        assert_eq!(traffic.total(), 9);
    }

    #[test]
    fn test_contributor_lines() {
        let stats: Vec<ContributorStats> = serde_json::from_str(
            r#"[
                { "total": 3, "author": { "login": "Me" },
                  "weeks": [ { "w": 1, "a": 10, "d": 2, "c": 1 }, { "w": 2, "a": 5, "d": 1, "c": 2 } ] },
                { "total": 1, "author": null, "weeks": [ { "w": 1, "a": 99, "d": 99, "c": 1 } ] }
            ]"#,
        )
        .unwrap();

        let lines: Vec<AuthorLines> = stats
            .into_iter()
            .filter_map(ContributorStats::into_author_lines)
            .collect();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].login, "Me");
        assert_eq!(lines[0].additions, 15);
        assert_eq!(lines[0].deletions, 3);
    }
}
