use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cleaner::SentenceCleaner;
use crate::config::DomainConfig;
use crate::TARGET_SEGMENT;

lazy_static! {
    // Everything after the first match belongs to the exclusion side
    static ref EXCLUSION_BOUNDARY: Regex =
        Regex::new(r"(?i)(?:exclu(?:de|sion) criteria:?)|(?:ineligibility criteria:?)").unwrap();
    // Hard-wrapped continuation lines
    static ref WRAPPED_LINE: Regex = Regex::new(r"\n {3,}").unwrap();
}

const BLANK_LINE: &str = "\n\n";
const DASH_BULLET: &str = "- ";

/// Which list a criterion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Include,
    Exclude,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Include => Side::Exclude,
            Side::Exclude => Side::Include,
        }
    }
}

/// A raw eligibility block cut at the exclusion boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<'a> {
    pub include: &'a str,
    pub exclude: Vec<&'a str>,
}

/// Splits `raw` at every exclusion boundary phrase. The first chunk is the
/// inclusion side; all later chunks, however many, are exclusion text.
pub fn partition(raw: &str) -> Partition<'_> {
    let mut chunks = EXCLUSION_BOUNDARY.split(raw);
    let include = chunks.next().unwrap_or("");
    Partition {
        include,
        exclude: chunks.collect(),
    }
}

/// Splits a chunk on blank lines.
pub fn split_blocks(chunk: &str) -> impl Iterator<Item = &str> {
    chunk.split(BLANK_LINE)
}

/// Splits a block on hyphen bullets.
pub fn split_bullets(block: &str) -> impl Iterator<Item = &str> {
    block.split(DASH_BULLET)
}

/// Joins hard-wrapped lines and trims; `None` for fragments with no content.
pub fn unwrap_lines(fragment: &str) -> Option<String> {
    let joined = WRAPPED_LINE.replace_all(fragment, " ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Raw, uncleaned fragments of one chunk in document order.
pub fn fragments(chunk: &str) -> Vec<String> {
    split_blocks(chunk)
        .flat_map(|block| split_bullets(block))
        .filter_map(unwrap_lines)
        .collect()
}

/// Turns a raw eligibility block into inclusion and exclusion criteria.
///
/// This is a layout heuristic. Blocks with no exclusion boundary put
/// everything on the inclusion side, and ALL-CAPS headers other than the
/// boundary phrase never start a new section.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaSegmenter<'a> {
    cleaner: SentenceCleaner<'a>,
}

impl<'a> CriteriaSegmenter<'a> {
    pub fn new(config: &'a DomainConfig) -> Self {
        Self {
            cleaner: SentenceCleaner::new(config),
        }
    }

    pub fn segment(&self, raw: &str) -> (Vec<String>, Vec<String>) {
        if raw.trim().is_empty() {
            return (Vec::new(), Vec::new());
        }

        let parts = partition(raw);
        let include = self.clean_chunk(parts.include);
        let exclude: Vec<String> = parts
            .exclude
            .iter()
            .flat_map(|chunk| self.clean_chunk(chunk))
            .collect();

        debug!(
            target: TARGET_SEGMENT,
            "Segmented {} exclusion chunk(s) into {} inclusion and {} exclusion criteria",
            parts.exclude.len(),
            include.len(),
            exclude.len()
        );

        (include, exclude)
    }

    fn clean_chunk(&self, chunk: &str) -> Vec<String> {
        fragments(chunk)
            .iter()
            // unwrapping can bring a "- " bullet onto one line
            .flat_map(|fragment| fragment.split(DASH_BULLET))
            .filter_map(|piece| self.cleaner.clean(piece))
            .collect()
    }
}

/// Segments `raw` with the default vocabulary.
pub fn segment(raw: &str) -> (Vec<String>, Vec<String>) {
    let config = DomainConfig::default();
    CriteriaSegmenter::new(&config).segment(raw)
}
