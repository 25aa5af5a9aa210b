//! Negation relocation
//!
//! A run of negated entities inside an inclusion criterion ("without diabetes
//! or hypertension") really describes an exclusion, and the reverse holds for
//! exclusion criteria. `relocate` cuts such runs out of one side's criteria so
//! the caller can append them to the other side.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace, warn};

use super::types::Entity;
use super::TARGET_REWRITE;
use crate::util::{char_len, char_slice, word_count};

// Prefixes with this many words or fewer are too short to keep
const MIN_PREFIX_WORDS: usize = 3;
// Trailing text needs more than this many words to be kept
const MIN_SUFFIX_WORDS: usize = 2;

/// Counters describing one relocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationStats {
    /// Criteria that contained at least one negated entity
    pub criteria_changed: usize,
    /// Multi-entity spans moved to the other side
    pub spans_relocated: usize,
    /// Single-entity spans left in place
    pub spans_dropped: usize,
    /// Last word of every prefix of more than three words before a negated span
    pub ending_words: BTreeMap<String, usize>,
}

impl RelocationStats {
    pub fn merge(&mut self, other: &RelocationStats) {
        self.criteria_changed += other.criteria_changed;
        self.spans_relocated += other.spans_relocated;
        self.spans_dropped += other.spans_dropped;
        for (word, count) in &other.ending_words {
            *self.ending_words.entry(word.clone()).or_insert(0) += count;
        }
    }
}

/// Output of one relocation direction.
///
/// `kept`/`kept_entities` replace the scanned side; `moved`/`moved_entities`
/// belong on the opposite side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relocation {
    pub kept: Vec<String>,
    pub kept_entities: Vec<Vec<Entity>>,
    pub moved: Vec<String>,
    pub moved_entities: Vec<Vec<Entity>>,
    pub stats: RelocationStats,
}

/// A contiguous run of negated entities, as entity indices `[first, last]`.
struct NegatedSpan {
    first: usize,
    last: usize,
}

impl NegatedSpan {
    fn entity_count(&self) -> usize {
        self.last - self.first + 1
    }
}

fn negated_spans(entities: &[Entity]) -> Vec<NegatedSpan> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < entities.len() {
        if entities[i].negated {
            let first = i;
            while i + 1 < entities.len() && entities[i + 1].negated {
                i += 1;
            }
            spans.push(NegatedSpan { first, last: i });
        }
        i += 1;
    }
    spans
}

/// Scans `criteria` and moves every multi-entity negated span out.
///
/// `entity_lists` is parallel to `criteria`; criteria without an entity list
/// pass through unchanged. Entity offsets are left as the annotator produced
/// them, relative to the criterion they came from.
pub fn relocate(
    criteria: &[String],
    entity_lists: &[Vec<Entity>],
    weak_endings: &HashSet<String>,
) -> Relocation {
    let mut relocation = Relocation::default();

    if criteria.len() != entity_lists.len() {
        warn!(
            target: TARGET_REWRITE,
            "Relocating {} criteria with {} entity lists",
            criteria.len(),
            entity_lists.len()
        );
    }

    for (i, criterion) in criteria.iter().enumerate() {
        let Some(entities) = entity_lists.get(i) else {
            relocation.kept.push(criterion.clone());
            relocation.kept_entities.push(Vec::new());
            continue;
        };

        let spans = negated_spans(entities);
        if spans.is_empty() {
            relocation.kept.push(criterion.clone());
            relocation.kept_entities.push(entities.clone());
            continue;
        }

        relocation.stats.criteria_changed += 1;
        let mut rebuilt = String::new();
        let mut rebuilt_entities = Vec::new();
        // Character offset and entity index of the first unconsumed text
        let mut cursor = 0;
        let mut entity_cursor = 0;

        for span in spans {
            let span_start = entities[span.first].start;
            let span_end = entities[span.last].end;
            let start_part = char_slice(criterion, cursor, span_start);

            // Only prefixes long enough to keep have their ending checked
            let good_end = match start_part.split_whitespace().last() {
                Some(last_word) if word_count(start_part) > MIN_PREFIX_WORDS => {
                    *relocation
                        .stats
                        .ending_words
                        .entry(last_word.to_string())
                        .or_insert(0) += 1;

                    if weak_endings.contains(last_word) {
                        trace!(target: TARGET_REWRITE, "Discarding prefix ending in '{}'", last_word);
                        None
                    } else {
                        rebuilt.push_str(start_part);
                        rebuilt_entities.extend_from_slice(&entities[entity_cursor..span.first]);
                        Some(last_word)
                    }
                }
                _ => None,
            };

            if span.entity_count() > 1 {
                let span_text = char_slice(criterion, span_start, span_end);
                let moved = match good_end {
                    Some(word) => format!("{} {}", word, span_text),
                    None => span_text.to_string(),
                };
                debug!(
                    target: TARGET_REWRITE,
                    "Relocating '{}' out of '{}'", moved, criterion
                );
                relocation.moved.push(moved);
                relocation
                    .moved_entities
                    .push(entities[span.first..=span.last].to_vec());
                relocation.stats.spans_relocated += 1;
                cursor = cursor.max(span_end);
                entity_cursor = span.last + 1;
            } else {
                // The lone negated entity stays at the head of what follows
                relocation.stats.spans_dropped += 1;
                cursor = cursor.max(span_start);
                entity_cursor = span.first;
            }
        }

        let end_part = char_slice(criterion, cursor, char_len(criterion));
        if word_count(end_part) > MIN_SUFFIX_WORDS {
            rebuilt.push_str(end_part);
            rebuilt_entities.extend_from_slice(&entities[entity_cursor..]);
        }

        let rebuilt = rebuilt.trim();
        if !rebuilt.is_empty() {
            relocation.kept.push(rebuilt.to_string());
            relocation.kept_entities.push(rebuilt_entities);
        }
    }

    relocation
}
