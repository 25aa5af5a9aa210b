//! Corpus-level counters over processed documents.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::document::CriteriaDocument;
use crate::entity::RelocationStats;

/// Summary of a processed corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub include_criteria: usize,
    pub exclude_criteria: usize,
    /// Documents where at least one criterion had a negated entity
    pub documents_changed: usize,
    pub relocation: RelocationStats,
}

impl CorpusStats {
    pub fn from_documents(documents: &[CriteriaDocument]) -> Self {
        let mut stats = CorpusStats {
            documents: documents.len(),
            ..Default::default()
        };

        for document in documents {
            stats.include_criteria += document.criteria.include.len();
            stats.exclude_criteria += document.criteria.exclude.len();
            if let Some(relocated) = &document.relocated {
                if relocated.stats.criteria_changed > 0 {
                    stats.documents_changed += 1;
                }
                stats.relocation.merge(&relocated.stats);
            }
        }

        stats
    }
}

/// Lowercased word frequencies over both criterion lists, minus `stopwords`.
pub fn word_counts(
    documents: &[CriteriaDocument],
    stopwords: &HashSet<String>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    let criteria = documents
        .iter()
        .flat_map(|d| d.criteria.include.iter().chain(d.criteria.exclude.iter()));

    for criterion in criteria {
        for word in criterion.split_whitespace() {
            let word = word.to_lowercase();
            if !stopwords.contains(&word) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }

    counts
}
