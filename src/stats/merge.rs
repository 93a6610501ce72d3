//! Merging repository facts into the aggregate record.

use super::filter::Filter;
use crate::models::{LanguageStats, MergeStatus, RepoStats, RepositoryFact, Stats};
use std::collections::BTreeMap;

impl Stats {
    /// Record `fact` and report whether it qualifies for enrichment.
    ///
    /// The first observation of a repository wins; later ones are no-ops.
    /// Star and fork totals count every recorded repository, ignored or not.
    /// Languages are merged only for [`MergeStatus::Included`] repositories.
    pub fn merge_repository(&mut self, fact: &RepositoryFact, filter: &Filter) -> MergeStatus {
        let key = fact.key();
        if self.repos.contains_key(&key) {
            return MergeStatus::Duplicate;
        }

        self.stargazers += fact.stargazers;
        self.forks += fact.fork_count;

        let mut record = RepoStats {
            name: fact.name_with_owner.clone(),
            forks: fact.fork_count,
            stargazers: fact.stargazers,
            languages: BTreeMap::new(),
            ignored: true,
        };

        let status = if !filter.includes_owner(&fact.owner()) {
            MergeStatus::NotOwned
        } else if let Some(reason) = filter.exclusion(fact) {
            MergeStatus::Excluded(reason)
        } else {
            for edge in &fact.languages {
                *record.languages.entry(edge.name.clone()).or_insert(0) += edge.size;

                if filter.excludes_language(&edge.name) {
                    continue;
                }
                let lang = self
                    .languages
                    .entry(edge.name.clone())
                    .or_insert_with(|| LanguageStats {
                        name: edge.name.clone(),
                        size: 0,
                        occurrences: 0,
                        color: edge.color.clone(),
                        proportion: 0.0,
                    });
                lang.size += edge.size;
                lang.occurrences += 1;
            }
            record.ignored = false;
            MergeStatus::Included
        };

        self.repos.insert(key, record);
        status
    }
}
