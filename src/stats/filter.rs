//! Repository and language exclusion rules.
//!
//! All names are compared case-insensitively; sets are stored lowercased.

use crate::models::{ExclusionReason, RepositoryFact};
use std::collections::HashSet;

/// Decides which repositories and languages count toward the totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    include_owners: HashSet<String>,
    exclude_repos: HashSet<String>,
    exclude_langs: HashSet<String>,
    ignore_forked_repos: bool,
    ignore_archived_repos: bool,
    ignore_private_repos: bool,
}

fn lowercase_set<I, S>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

impl Filter {
    /// Create a filter accepting repositories of the given owners.
    pub fn new<I, S>(include_owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include_owners: lowercase_set(include_owners),
            ..Self::default()
        }
    }

    /// Exclude repositories by full `owner/repo` name.
    #[must_use]
    pub fn exclude_repos<I, S>(mut self, repos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_repos = lowercase_set(repos);
        self
    }

    /// Exclude languages from the language totals.
    #[must_use]
    pub fn exclude_langs<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_langs = lowercase_set(langs);
        self
    }

    #[must_use]
    pub fn ignore_forked_repos(mut self, ignore: bool) -> Self {
        self.ignore_forked_repos = ignore;
        self
    }

    #[must_use]
    pub fn ignore_archived_repos(mut self, ignore: bool) -> Self {
        self.ignore_archived_repos = ignore;
        self
    }

    #[must_use]
    pub fn ignore_private_repos(mut self, ignore: bool) -> Self {
        self.ignore_private_repos = ignore;
        self
    }

    /// Whether repositories of `owner` count as the account's own.
    pub fn includes_owner(&self, owner: &str) -> bool {
        self.include_owners.contains(&owner.to_lowercase())
    }

    /// First exclusion rule matching `fact`.
    ///
    /// Rules are checked in a fixed order: name, forked, archived, private.
    pub fn exclusion(&self, fact: &RepositoryFact) -> Option<ExclusionReason> {
        if self.exclude_repos.contains(&fact.key()) {
            Some(ExclusionReason::Name)
        } else if self.ignore_forked_repos && fact.is_fork {
            Some(ExclusionReason::Forked)
        } else if self.ignore_archived_repos && fact.is_archived {
            Some(ExclusionReason::Archived)
        } else if self.ignore_private_repos && fact.is_private {
            Some(ExclusionReason::Private)
        } else {
            None
        }
    }

    /// Whether a language is left out of the language totals.
    pub fn excludes_language(&self, language: &str) -> bool {
        self.exclude_langs.contains(&language.to_lowercase())
    }
}
