pub mod cleaner;
pub mod segmenter;


use serde::{Deserialize, Serialize};

pub use cleaner::SentenceCleaner;
pub use segmenter::{segment, CriteriaSegmenter, Side};

use crate::config::DomainConfig;

/// A document's eligibility block and the criteria segmented from it.
///
/// Neither the raw text nor the segmented lists change after construction;
/// rewrites produce new lists elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub raw_text: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl EligibilityCriteria {
    pub fn from_raw(raw_text: &str, config: &DomainConfig) -> Self {
        let (include, exclude) = CriteriaSegmenter::new(config).segment(raw_text);
        Self {
            raw_text: raw_text.to_string(),
            include,
            exclude,
        }
    }

    pub fn side(&self, side: Side) -> &[String] {
        match side {
            Side::Include => &self.include,
            Side::Exclude => &self.exclude,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}
