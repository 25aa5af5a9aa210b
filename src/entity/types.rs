use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::char_slice;

/// Concept an entity mention was linked to, with the linker's score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(alias = "val")]
    pub id: String,
    pub score: f64,
}

impl Concept {
    pub fn new(id: &str, score: f64) -> Self {
        Concept {
            id: id.to_string(),
            score,
        }
    }
}

/// A recognized mention inside one criterion, as produced by the annotator.
///
/// `start` and `end` are character offsets into the criterion text the
/// annotator saw. They are never rewritten, even when the entity is carried
/// into a relocated or expanded criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    // Mention text exactly as it appears in the criterion
    pub raw_text: String,

    // Model label, e.g. ENTITY
    pub label: String,

    pub start: usize,
    pub end: usize,

    #[serde(alias = "cui")]
    pub concept: Concept,

    // Ranked synonyms of the linked concept
    #[serde(default, alias = "alias_expansion")]
    pub aliases: Vec<String>,

    #[serde(default, alias = "negation")]
    pub negated: bool,
}

impl Entity {
    pub fn new(raw_text: &str, start: usize, end: usize) -> Self {
        Entity {
            raw_text: raw_text.to_string(),
            label: "ENTITY".to_string(),
            start,
            end,
            concept: Concept::default(),
            aliases: Vec::new(),
            negated: false,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_concept(mut self, id: &str, score: f64) -> Self {
        self.concept = Concept::new(id, score);
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    /// Locates `raw_text` in `text` (first occurrence at or after `from`, in
    /// characters) and builds an entity spanning it.
    pub fn find_in(text: &str, raw_text: &str, from: usize) -> Option<Self> {
        let skip = crate::util::byte_offset(text, from);
        let byte_start = text[skip..].find(raw_text)? + skip;
        let start = text[..byte_start].chars().count();
        let end = start + raw_text.chars().count();
        Some(Entity::new(raw_text, start, end))
    }

    /// Keeps at most `max` aliases.
    pub fn cap_aliases(&mut self, max: usize) {
        self.aliases.truncate(max);
    }

    /// The mention as it appears in `text` according to the entity offsets.
    pub fn span_in<'a>(&self, text: &'a str) -> &'a str {
        char_slice(text, self.start, self.end)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{})", self.raw_text, self.start, self.end)?;
        if self.negated {
            write!(f, " NEG")?;
        }
        Ok(())
    }
}
