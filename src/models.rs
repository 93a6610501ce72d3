//! Data models for the stats aggregator.
//!
//! This module contains the repository facts produced by the GitHub client
//! and the aggregate record ([`Stats`]) the engine builds from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One language entry of a repository listing, ordered by size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEdge {
    /// Language display name (e.g. "Rust").
    pub name: String,
    /// Bytes of code in this language.
    pub size: u64,
    /// Display color, when GitHub knows one.
    pub color: Option<String>,
}

/// Snapshot of a repository as seen on one page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryFact {
    /// `owner/repo`.
    pub name_with_owner: String,
    pub fork_count: u64,
    pub stargazers: u64,
    pub is_fork: bool,
    pub is_archived: bool,
    pub is_private: bool,
    pub languages: Vec<LanguageEdge>,
}

impl RepositoryFact {
    /// Case-insensitive identity of the repository.
    pub fn key(&self) -> String {
        self.name_with_owner.to_lowercase()
    }

    /// Lowercased owner, the part before the first `/`.
    pub fn owner(&self) -> String {
        self.name_with_owner
            .split('/')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// One page of a repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPage {
    pub facts: Vec<RepositoryFact>,
    /// Cursor to pass for the following page.
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Lines authored by one contributor of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorLines {
    pub login: String,
    pub additions: u64,
    pub deletions: u64,
}

/// Per-repository entry of the aggregate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub name: String,
    pub forks: u64,
    pub stargazers: u64,
    pub languages: BTreeMap<String, u64>,
    /// True unless the repository passed every filter.
    pub ignored: bool,
}

/// Aggregate of one language across all included repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub name: String,
    pub size: u64,
    pub occurrences: u64,
    pub color: Option<String>,
    /// Share of all language bytes, in percent. Zero until computed.
    pub proportion: f64,
}

impl LanguageStats {
    /// Proportion formatted for display, e.g. `"42.000%"`.
    pub fn percent(&self) -> String {
        format!("{:.3}%", self.proportion)
    }
}

/// Contribution counters for the account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionsSummary {
    pub total_contributions: u64,
    pub total_commit_contributions: u64,
    pub total_issue_contributions: u64,
    pub total_pull_request_contributions: u64,
    pub total_pull_request_review_contributions: u64,
}

impl std::ops::AddAssign for ContributionsSummary {
    fn add_assign(&mut self, other: Self) {
        self.total_contributions += other.total_contributions;
        self.total_commit_contributions += other.total_commit_contributions;
        self.total_issue_contributions += other.total_issue_contributions;
        self.total_pull_request_contributions += other.total_pull_request_contributions;
        self.total_pull_request_review_contributions +=
            other.total_pull_request_review_contributions;
    }
}

/// Lines added and deleted by the account across included repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChanges {
    pub additions: u64,
    pub deletions: u64,
}

/// Traffic views across included repositories (past two weeks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Views {
    pub count: u64,
}

/// Outcome of merging one [`RepositoryFact`] into [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Already recorded by an earlier page or source.
    Duplicate,
    /// Owner is not in the include-owner set.
    NotOwned,
    /// Recorded, but filtered out by an exclusion rule.
    Excluded(ExclusionReason),
    /// Recorded with languages merged; eligible for enrichment.
    Included,
}

/// Which exclusion rule matched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    Name,
    Forked,
    Archived,
    Private,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Name => write!(f, "excluded by name"),
            ExclusionReason::Forked => write!(f, "forked"),
            ExclusionReason::Archived => write!(f, "archived"),
            ExclusionReason::Private => write!(f, "private"),
        }
    }
}

/// The aggregate record handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub name: String,
    pub stargazers: u64,
    pub forks: u64,
    /// Keyed by language name.
    pub languages: BTreeMap<String, LanguageStats>,
    /// Keyed by lowercased `owner/repo`.
    pub repos: BTreeMap<String, RepoStats>,
    pub contributions: ContributionsSummary,
    /// `None` when line-change enrichment is disabled.
    pub line_changes: Option<LineChanges>,
    /// `None` when view enrichment is disabled.
    pub views: Option<Views>,
}

impl Stats {
    /// Creates an empty record for the given account.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Total lines added plus deleted, zero when not collected.
    pub fn lines_changed(&self) -> u64 {
        self.line_changes
            .map(|lines| lines.additions + lines.deletions)
            .unwrap_or(0)
    }

    /// Number of repositories recorded, ignored ones included.
    pub fn repos_count(&self) -> usize {
        self.repos.len()
    }

    /// Sum of all language sizes.
    pub fn total_language_size(&self) -> u64 {
        self.languages.values().map(|lang| lang.size).sum()
    }

    /// Fill in every language's share of the total byte count.
    ///
    /// Must run only after every page has been merged. An empty language
    /// set leaves nothing to compute.
    pub fn compute_proportions(&mut self) {
        let total = self.total_language_size();
        if total == 0 {
            return;
        }
        for lang in self.languages.values_mut() {
            lang.proportion = 100.0 * lang.size as f64 / total as f64;
        }
    }

    /// Languages ordered largest first, ties by name.
    pub fn languages_by_size(&self) -> Vec<&LanguageStats> {
        let mut langs: Vec<&LanguageStats> = self.languages.values().collect();
        langs.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
        langs
    }
}
