//! Alias expansion
//!
//! Inserts the ranked synonyms of each recognized entity directly before its
//! mention, so "left ventricular hypertrophy" becomes "lv hypertrophy enlarged
//! left ventricle left ventricular hypertrophy". The input text is never
//! modified; each insertion builds a new string and a running count of inserted alias
//! characters maps the annotator's offsets into the growing text.

use std::collections::HashSet;
use tracing::{debug, trace, warn};

use super::types::Entity;
use super::TARGET_REWRITE;
use crate::util::{byte_offset, drop_last_char};

// Stripped from both ends of every alias
const ALIAS_EDGE: &[char] = &[',', '.', '?'];

/// Whether the mention is one of the known bad expansions, e.g. "ERs" linking
/// to endoplasmic reticulum. The last character is ignored so plurals match.
pub fn is_excluded(entity: &Entity, excluded_terms: &HashSet<String>) -> bool {
    let lowered = entity.raw_text.to_lowercase();
    excluded_terms.contains(drop_last_char(&lowered))
}

/// Normalized aliases worth inserting for `entity`, in rank order.
pub fn alias_candidates(entity: &Entity) -> Vec<String> {
    let mention = entity.raw_text.to_lowercase();
    entity
        .aliases
        .iter()
        .map(|alias| alias.to_lowercase().trim_matches(ALIAS_EDGE).to_string())
        .filter(|alias| *alias != mention)
        .collect()
}

/// Shortens the candidate list when the last alias would end with the word
/// that already follows the insertion point ("hypertrophy septal" before
/// "septal hypertrophy" keeps only "hypertrophy").
fn trim_duplicate_suffix(mut candidates: Vec<String>, end: &str) -> Vec<String> {
    let Some(next_word) = end.split_whitespace().next() else {
        return candidates;
    };
    let Some(last_alias) = candidates.last() else {
        return candidates;
    };

    let words: Vec<&str> = last_alias.split_whitespace().collect();
    let Some(&last_word) = words.last() else {
        return candidates;
    };

    if next_word == last_word || drop_last_char(next_word) == last_word {
        if words.len() > 1 {
            let shortened = words[..words.len() - 1].join(" ");
            if let Some(last) = candidates.last_mut() {
                *last = shortened;
            }
        } else {
            candidates.pop();
        }
    }
    candidates
}

/// Expands `text` with the aliases of `entities`.
///
/// Entities must be ordered by ascending `start` with character offsets into
/// `text`. Entities that are excluded or have no usable alias leave the text
/// untouched.
pub fn expand(text: &str, entities: &[Entity], excluded_terms: &HashSet<String>) -> String {
    let mut expanded = text.to_string();
    // Characters inserted so far
    let mut added = 0;

    for entity in entities {
        if is_excluded(entity, excluded_terms) {
            trace!(target: TARGET_REWRITE, "Not aliasing excluded term '{}'", entity.raw_text);
            continue;
        }

        let candidates = alias_candidates(entity);
        if candidates.is_empty() {
            continue;
        }

        let split_at = byte_offset(&expanded, entity.start + added);
        let (head, end) = expanded.split_at(split_at);
        let mut begin = head.to_string();
        // The separator is not counted in `added`
        if !begin.is_empty() && !begin.ends_with(' ') {
            begin.push(' ');
        }

        let candidates = trim_duplicate_suffix(candidates, end);
        let mut add_part = candidates.join(" ");
        if add_part.is_empty() {
            continue;
        }
        add_part.push(' ');

        debug!(
            target: TARGET_REWRITE,
            "Inserting '{}' before '{}'",
            add_part.trim_end(),
            entity.raw_text
        );

        added += add_part.chars().count();
        expanded = format!("{}{}{}", begin, add_part, end);
    }

    expanded
}

/// Expands each sentence with its own entity list.
///
/// Sentences without a matching entity list are returned unchanged.
pub fn expand_all(
    sentences: &[String],
    entity_lists: &[Vec<Entity>],
    excluded_terms: &HashSet<String>,
) -> Vec<String> {
    if sentences.len() != entity_lists.len() {
        warn!(
            target: TARGET_REWRITE,
            "Expanding {} sentences with {} entity lists",
            sentences.len(),
            entity_lists.len()
        );
    }

    sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| match entity_lists.get(i) {
            Some(entities) => expand(sentence, entities, excluded_terms),
            None => sentence.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;

    fn excluded() -> HashSet<String> {
        DomainConfig::default().excluded_terms
    }

    #[test]
    fn test_no_candidates_is_noop() {
        let text = "unexplained hypertrophy";
        let entities = vec![
            Entity::new("unexplained", 0, 11).with_aliases(&["Unexplained", "unexplained."]),
            Entity::new("hypertrophy", 12, 23),
        ];
        assert_eq!(expand(text, &entities, &excluded()), text);
    }

    #[test]
    fn test_expand_left_ventricular_hypertrophy() {
        let text = "unexplained left ventricular hypertrophy";
        let entities = vec![
            Entity::new("unexplained", 0, 11).with_aliases(&["Unexplained"]),
            Entity::new("left ventricular hypertrophy", 12, 40)
                .with_aliases(&["lv hypertrophy", "Enlarged left ventricle"]),
        ];
        assert_eq!(
            expand(text, &entities, &excluded()),
            "unexplained lv hypertrophy enlarged left ventricle left ventricular hypertrophy"
        );
    }

    #[test]
    fn test_expand_trims_duplicate_suffix() {
        let text = "isolated septal hypertrophy";
        let entities = vec![
            Entity::new("isolated", 0, 8).with_aliases(&["Isolated", "isolated"]),
            Entity::new("septal hypertrophy", 9, 27)
                .with_aliases(&["septal hypertrophy", "hypertrophy septal"]),
        ];
        assert_eq!(
            expand(text, &entities, &excluded()),
            "isolated hypertrophy septal hypertrophy"
        );
    }

    #[test]
    fn test_single_word_duplicate_dropped() {
        // "tumors" minus its last character matches the alias
        let text = "solid tumors";
        let entities = vec![Entity::new("tumors", 6, 12).with_aliases(&["neoplasm", "tumor"])];
        assert_eq!(
            expand(text, &entities, &excluded()),
            "solid neoplasm tumors"
        );

        let only_duplicate = vec![Entity::new("tumors", 6, 12).with_aliases(&["tumor"])];
        assert_eq!(expand(text, &only_duplicate, &excluded()), text);
    }

    #[test]
    fn test_excluded_terms() {
        let text = "ERs positive breast cancer";
        let entities = vec![Entity::new("ERs", 0, 3).with_aliases(&["endoplasmic reticulum"])];
        assert_eq!(expand(text, &entities, &excluded()), text);

        let custom = DomainConfig::default().with_excluded_term("cance").excluded_terms;
        let cancer = vec![Entity::new("cancer", 20, 26).with_aliases(&["malignancy"])];
        assert_eq!(expand(text, &cancer, &custom), text);
        assert_eq!(
            expand(text, &cancer, &excluded()),
            "ERs positive breast malignancy cancer"
        );
    }

    #[test]
    fn test_second_entity_offset_after_insertion() {
        let text = "diabetes or hypertension";
        let entities = vec![
            Entity::new("diabetes", 0, 8).with_aliases(&["DM"]),
            Entity::new("hypertension", 12, 24).with_aliases(&["high blood pressure"]),
        ];
        assert_eq!(
            expand(text, &entities, &excluded()),
            "dm diabetes or high blood pressure hypertension"
        );
    }

    #[test]
    fn test_separator_space_not_counted() {
        // The space after "(" shifts the second insertion one character left
        let text = "(diabetes) or hypertension";
        let entities = vec![
            Entity::new("diabetes", 1, 9).with_aliases(&["DM"]),
            Entity::new("hypertension", 14, 26).with_aliases(&["HTN"]),
        ];
        assert_eq!(
            expand(text, &entities, &excluded()),
            "( dm diabetes) or htn  hypertension"
        );
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "hémoglobine ≥ 10 g/dL and anemia";
        let entities = vec![
            Entity::new("hémoglobine", 0, 11).with_aliases(&["Hb"]),
            Entity::new("anemia", 26, 32).with_aliases(&["anaemia"]),
        ];
        assert_eq!(
            expand(text, &entities, &excluded()),
            "hb hémoglobine ≥ 10 g/dL and anaemia anemia"
        );
    }

    #[test]
    fn test_never_shorter() {
        let text = "history of myocardial infarction within 6 months";
        let entities = vec![
            Entity::new("myocardial infarction", 11, 32)
                .with_aliases(&["MI", "heart attack", "infarction"]),
            Entity::new("months", 42, 48).with_aliases(&["mo"]),
        ];
        let expanded = expand(text, &entities, &excluded());
        assert!(expanded.len() >= text.len());
        assert!(expanded.ends_with("within 6 mo months"));
        assert!(expanded.contains("mi heart attack infarction myocardial infarction"));
    }

    #[test]
    fn test_alias_punctuation_stripped() {
        let entities = vec![Entity::new("seizures", 0, 8).with_aliases(&["Epilepsy,", "?Fits."])];
        assert_eq!(
            alias_candidates(&entities[0]),
            vec!["epilepsy".to_string(), "fits".to_string()]
        );
    }

    #[test]
    fn test_expand_all() {
        let sentences = vec!["stroke".to_string(), "pregnancy".to_string()];
        let entity_lists = vec![vec![Entity::new("stroke", 0, 6).with_aliases(&["CVA"])]];
        assert_eq!(
            expand_all(&sentences, &entity_lists, &excluded()),
            vec!["cva stroke".to_string(), "pregnancy".to_string()]
        );
    }
}
